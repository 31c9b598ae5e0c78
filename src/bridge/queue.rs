//! Outbound FIFO of call segments for one direction.
//!
//! Voice is queued as individual 20 ms slices so that the two sides can
//! regroup it (three per DMR burst, five per YSF frame).

use std::collections::VecDeque;

use tracing::warn;

use crate::dmr::VoiceSlice;

/// Duration of one voice slice in milliseconds.
pub const SLICE_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<H> {
    Header(H),
    Slice(VoiceSlice),
    End,
}

/// Bounded on voice slices; headers and ends are never dropped.
#[derive(Debug, Clone)]
pub struct OutboundQueue<H> {
    segments: VecDeque<Segment<H>>,
    slices: usize,
    capacity: usize,
    dropped: u64,
}

impl<H> OutboundQueue<H> {
    /// Create a queue holding at most `capacity` voice slices.
    pub fn new(capacity: usize) -> Self {
        Self {
            segments: VecDeque::new(),
            slices: 0,
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn push_header(&mut self, header: H) {
        self.segments.push_back(Segment::Header(header));
    }

    pub fn push_end(&mut self) {
        self.segments.push_back(Segment::End);
    }

    /// Queue a slice, dropping the oldest queued slice when full.
    pub fn push_slice(&mut self, slice: VoiceSlice) {
        if self.slices >= self.capacity {
            if let Some(pos) = self
                .segments
                .iter()
                .position(|s| matches!(s, Segment::Slice(_)))
            {
                self.segments.remove(pos);
                self.slices -= 1;
                self.dropped += 1;
                warn!(
                    "Outbound voice queue full ({} slices), dropping oldest",
                    self.capacity
                );
            }
        }
        self.segments.push_back(Segment::Slice(slice));
        self.slices += 1;
    }

    pub fn front(&self) -> Option<&Segment<H>> {
        self.segments.front()
    }

    pub fn pop_front(&mut self) -> Option<Segment<H>> {
        let segment = self.segments.pop_front()?;
        if matches!(segment, Segment::Slice(_)) {
            self.slices -= 1;
        }
        Some(segment)
    }

    /// Number of slices queued before the next header or end.
    fn leading_slices(&self) -> usize {
        self.segments
            .iter()
            .take_while(|s| matches!(s, Segment::Slice(_)))
            .count()
    }

    /// Take `N` slices from the front.
    ///
    /// With fewer than `N` queued, waits for more unless the call ends right
    /// after them, in which case the remainder is padded with silence.
    pub fn take_slices<const N: usize>(&mut self) -> Option<[VoiceSlice; N]> {
        let available = self.leading_slices();
        if available == 0 {
            return None;
        }
        if available < N && !matches!(self.segments.get(available), Some(Segment::End)) {
            return None;
        }

        let mut out = [VoiceSlice::SILENCE; N];
        for slot in out.iter_mut().take(available.min(N)) {
            if let Some(Segment::Slice(slice)) = self.pop_front() {
                *slot = slice;
            }
        }
        Some(out)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Voice slices currently queued.
    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Slices dropped on overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.slices = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(b: u8) -> VoiceSlice {
        VoiceSlice::from_bytes([b; 9])
    }

    #[test]
    fn test_waits_for_full_group() {
        let mut queue: OutboundQueue<()> = OutboundQueue::new(10);
        queue.push_slice(slice(1));
        queue.push_slice(slice(2));
        assert_eq!(queue.take_slices::<3>(), None);
        queue.push_slice(slice(3));
        assert_eq!(queue.take_slices::<3>(), Some([slice(1), slice(2), slice(3)]));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pads_before_end() {
        let mut queue: OutboundQueue<()> = OutboundQueue::new(10);
        queue.push_slice(slice(1));
        queue.push_slice(slice(2));
        queue.push_end();
        assert_eq!(
            queue.take_slices::<5>(),
            Some([slice(1), slice(2), VoiceSlice::SILENCE, VoiceSlice::SILENCE, VoiceSlice::SILENCE])
        );
        assert_eq!(queue.front(), Some(&Segment::End));
        assert_eq!(queue.take_slices::<5>(), None);
    }

    #[test]
    fn test_overflow_drops_oldest_slice_only() {
        let mut queue = OutboundQueue::new(2);
        queue.push_header("hdr");
        queue.push_slice(slice(1));
        queue.push_slice(slice(2));
        queue.push_slice(slice(3));
        assert_eq!(queue.slices(), 2);
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.pop_front(), Some(Segment::Header("hdr")));
        assert_eq!(queue.pop_front(), Some(Segment::Slice(slice(2))));
    }
}

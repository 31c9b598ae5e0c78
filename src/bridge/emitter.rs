//! Turn queued segments into frames of the target protocol.

use super::queue::{OutboundQueue, Segment};
use crate::dmr::{Burst, DataType, DmrData, EmbeddedLc, LinkControl, VoiceSlice, SUPERFRAME_LENGTH};
use crate::types::Slot;
use crate::ysf::{FrameAddress, YsfFrame, SLICES_PER_FRAME};

/// Voice LC headers sent at the start of each DMR call.
pub const DMR_HEADER_REPEATS: u8 = 3;

const SLICES_PER_BURST: usize = 3;

/// Produces DMR bursts: repeated header, voice superframes, fill and terminator.
#[derive(Debug, Clone)]
pub struct DmrEmitter {
    slot: Slot,
    color_code: u8,
    call: Option<(LinkControl, EmbeddedLc)>,
    headers_sent: u8,
    n: u8,
}

impl DmrEmitter {
    pub fn new(slot: Slot, color_code: u8) -> Self {
        Self {
            slot,
            color_code,
            call: None,
            headers_sent: 0,
            n: 0,
        }
    }

    /// Superframe position of the next voice burst.
    pub fn position(&self) -> u8 {
        self.n
    }

    fn packet(&self, lc: &LinkControl, data_type: DataType, n: u8, burst: Burst) -> DmrData {
        DmrData::new(self.slot, lc.src, lc.dst, lc.call_type, data_type, burst).with_n(n)
    }

    fn voice(&mut self, slices: &[VoiceSlice; SLICES_PER_BURST]) -> Option<DmrData> {
        let (lc, embedded) = self.call.as_ref()?;
        let n = self.n;
        let burst = Burst::encode_voice_burst(slices, n, embedded, self.color_code);
        let data_type = if n == 0 {
            DataType::VoiceSync
        } else {
            DataType::Voice
        };
        let packet = self.packet(lc, data_type, n, burst);
        self.n = (n + 1) % SUPERFRAME_LENGTH;
        Some(packet)
    }

    /// Next burst to send, if the queue holds enough for one.
    pub fn next(&mut self, queue: &mut OutboundQueue<LinkControl>) -> Option<DmrData> {
        match queue.front()? {
            Segment::Header(lc) => {
                let lc = *lc;
                if self.headers_sent == 0 {
                    self.call = Some((lc, EmbeddedLc::new(&lc)));
                    self.n = 0;
                }
                self.headers_sent += 1;
                if self.headers_sent >= DMR_HEADER_REPEATS {
                    queue.pop_front();
                    self.headers_sent = 0;
                }
                let burst = Burst::encode_header(&lc, self.color_code);
                Some(self.packet(&lc, DataType::VoiceLcHeader, 0, burst))
            }
            Segment::Slice(_) => {
                if self.call.is_none() {
                    queue.pop_front();
                    return None;
                }
                let slices = queue.take_slices::<SLICES_PER_BURST>()?;
                self.voice(&slices)
            }
            Segment::End => {
                if self.n != 0 {
                    // Complete the superframe so the embedded LC sequence is whole.
                    return self.voice(&[VoiceSlice::SILENCE; SLICES_PER_BURST]);
                }
                queue.pop_front();
                let (lc, _) = self.call.take()?;
                let burst = Burst::encode_terminator(&lc, self.color_code);
                Some(self.packet(&lc, DataType::TerminatorWithLc, 0, burst))
            }
        }
    }

    pub fn reset(&mut self) {
        self.call = None;
        self.headers_sent = 0;
        self.n = 0;
    }
}

/// Produces YSF frames: header, V/D mode 2 voice, terminator.
#[derive(Debug, Clone, Default)]
pub struct YsfEmitter {
    address: Option<FrameAddress>,
    voice_frames: u32,
    counter: u8,
}

impl YsfEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u8 {
        let counter = self.counter;
        self.counter = (self.counter + 1) & 0x7F;
        counter
    }

    /// Next frame to send, if the queue holds enough for one.
    pub fn next(&mut self, queue: &mut OutboundQueue<FrameAddress>) -> Option<YsfFrame> {
        match queue.front()? {
            Segment::Header(address) => {
                let address = *address;
                queue.pop_front();
                self.address = Some(address);
                self.voice_frames = 0;
                self.counter = 0;
                let counter = self.bump();
                Some(YsfFrame::encode_header(&address, counter))
            }
            Segment::Slice(_) => {
                let Some(address) = self.address else {
                    queue.pop_front();
                    return None;
                };
                let slices = queue.take_slices::<SLICES_PER_FRAME>()?;
                let frame_number = (self.voice_frames % 8) as u8;
                self.voice_frames += 1;
                let counter = self.bump();
                Some(YsfFrame::encode_voice(&address, counter, frame_number, &slices))
            }
            Segment::End => {
                queue.pop_front();
                let address = self.address.take()?;
                let counter = self.bump();
                Some(YsfFrame::encode_terminator(&address, counter))
            }
        }
    }

    pub fn reset(&mut self) {
        self.address = None;
        self.voice_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallType, Callsign, DmrId};

    fn lc() -> LinkControl {
        LinkControl::new(CallType::Group, DmrId::new(1_234_567), DmrId::new(91))
    }

    #[test]
    fn test_header_repeats_then_voice() {
        let mut queue = OutboundQueue::new(64);
        let mut emitter = DmrEmitter::new(Slot::Two, 1);
        queue.push_header(lc());
        for _ in 0..3 {
            queue.push_slice(VoiceSlice::SILENCE);
        }

        let types: Vec<DataType> = std::iter::from_fn(|| emitter.next(&mut queue))
            .map(|d| d.data_type)
            .collect();
        assert_eq!(
            types,
            [
                DataType::VoiceLcHeader,
                DataType::VoiceLcHeader,
                DataType::VoiceLcHeader,
                DataType::VoiceSync
            ]
        );
        assert_eq!(emitter.position(), 1);
    }

    #[test]
    fn test_fill_before_terminator() {
        let mut queue = OutboundQueue::new(64);
        let mut emitter = DmrEmitter::new(Slot::Two, 1);
        queue.push_header(lc());
        // Two full bursts, then one slice and the end.
        for _ in 0..7 {
            queue.push_slice(VoiceSlice::from_bytes([0x42; 9]));
        }
        queue.push_end();

        let out: Vec<DmrData> = std::iter::from_fn(|| emitter.next(&mut queue)).collect();
        let ns: Vec<(DataType, u8)> = out.iter().skip(3).map(|d| (d.data_type, d.n)).collect();
        assert_eq!(
            ns,
            [
                (DataType::VoiceSync, 0),
                (DataType::Voice, 1),
                (DataType::Voice, 2),
                (DataType::Voice, 3),
                (DataType::Voice, 4),
                (DataType::Voice, 5),
                (DataType::TerminatorWithLc, 0),
            ]
        );
        // The third burst holds the last real slice padded with silence.
        let third = out[5].burst.slices();
        assert_eq!(third[0], VoiceSlice::from_bytes([0x42; 9]));
        assert_eq!(third[1], VoiceSlice::SILENCE);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ysf_frame_numbers() {
        let address = FrameAddress {
            gateway: Callsign::new("EA7EE"),
            source: Callsign::new("G4KLX"),
            destination: Callsign::new("TG 91"),
        };
        let mut queue = OutboundQueue::new(256);
        let mut emitter = YsfEmitter::new();
        queue.push_header(address);
        for _ in 0..(10 * SLICES_PER_FRAME) {
            queue.push_slice(VoiceSlice::SILENCE);
        }
        queue.push_end();

        let frames: Vec<YsfFrame> = std::iter::from_fn(|| emitter.next(&mut queue)).collect();
        assert_eq!(frames.len(), 12);
        let numbers: Vec<u8> = frames[1..11]
            .iter()
            .map(|f| f.fich().unwrap().frame_number)
            .collect();
        assert_eq!(numbers, [0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);
        assert_eq!(frames[0].counter(), 0);
        assert_eq!(frames[11].counter(), 11);
        assert!(frames[11].is_end());
    }
}

//! Per-direction call session state machine.

use std::time::Instant;

use crate::types::FrameTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    HeaderSent,
    Streaming,
}

/// What an inbound frame did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A header opened a new call.
    Started,
    /// A header arrived mid-call after voice: the old call ends and a new one starts.
    Restarted,
    /// A repeated header; nothing to do.
    Duplicate,
    /// Voice arrived while idle; the call is opened from the voice frame itself.
    LateEntry,
    /// Voice within a call.
    Continued,
    /// The call ended.
    Ended,
    /// A terminator while idle.
    Ignored,
}

/// One direction's call, carrying the outbound addressing `A`.
#[derive(Debug, Clone)]
pub struct CallSession<A> {
    state: CallState,
    last_tag: Option<FrameTag>,
    address: Option<A>,
    frames: u32,
    started: Option<Instant>,
}

impl<A> CallSession<A> {
    pub fn new() -> Self {
        Self {
            state: CallState::Idle,
            last_tag: None,
            address: None,
            frames: 0,
            started: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != CallState::Idle
    }

    pub fn address(&self) -> Option<&A> {
        self.address.as_ref()
    }

    /// Voice frames seen in the current call.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Time since the call started.
    pub fn duration(&self) -> Option<std::time::Duration> {
        self.started.map(|t| t.elapsed())
    }

    /// Advance on an inbound frame. `address` is only evaluated when a call opens.
    pub fn on_frame(&mut self, tag: FrameTag, address: impl FnOnce() -> A) -> Transition {
        let transition = match tag {
            FrameTag::Header => match (self.state, self.last_tag) {
                (CallState::Idle, _) => Transition::Started,
                (_, Some(FrameTag::Header)) => Transition::Duplicate,
                _ => Transition::Restarted,
            },
            FrameTag::Data if self.is_active() => Transition::Continued,
            FrameTag::Data => Transition::LateEntry,
            FrameTag::EndOfTransmission if self.is_active() => Transition::Ended,
            FrameTag::EndOfTransmission => Transition::Ignored,
        };

        match transition {
            Transition::Started | Transition::Restarted => self.open(CallState::HeaderSent, address()),
            Transition::LateEntry => {
                self.open(CallState::Streaming, address());
                self.frames = 1;
            }
            Transition::Continued => {
                self.state = CallState::Streaming;
                self.frames += 1;
            }
            Transition::Ended => self.close(),
            Transition::Duplicate | Transition::Ignored => {}
        }

        self.last_tag = Some(tag);
        transition
    }

    fn open(&mut self, state: CallState, address: A) {
        self.state = state;
        self.address = Some(address);
        self.frames = 0;
        self.started = Some(Instant::now());
    }

    fn close(&mut self) {
        self.state = CallState::Idle;
        self.address = None;
        self.started = None;
    }

    /// Drop the call without a terminator; returns whether one was active.
    pub fn abort(&mut self) -> bool {
        let was_active = self.is_active();
        self.close();
        self.last_tag = None;
        was_active
    }
}

impl<A> Default for CallSession<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_call() {
        let mut session = CallSession::new();
        assert_eq!(session.on_frame(FrameTag::Header, || 1), Transition::Started);
        assert_eq!(session.state(), CallState::HeaderSent);
        assert_eq!(session.on_frame(FrameTag::Data, || 2), Transition::Continued);
        assert_eq!(session.on_frame(FrameTag::Data, || 2), Transition::Continued);
        assert_eq!(session.state(), CallState::Streaming);
        assert_eq!(session.frames(), 2);
        assert_eq!(session.address(), Some(&1));
        assert_eq!(
            session.on_frame(FrameTag::EndOfTransmission, || 3),
            Transition::Ended
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_repeated_header_is_duplicate() {
        let mut session = CallSession::new();
        session.on_frame(FrameTag::Header, || 1);
        assert_eq!(session.on_frame(FrameTag::Header, || 2), Transition::Duplicate);
        assert_eq!(session.address(), Some(&1));
    }

    #[test]
    fn test_header_after_voice_restarts() {
        let mut session = CallSession::new();
        session.on_frame(FrameTag::Header, || 1);
        session.on_frame(FrameTag::Data, || 1);
        assert_eq!(session.on_frame(FrameTag::Header, || 2), Transition::Restarted);
        assert_eq!(session.address(), Some(&2));
        assert_eq!(session.state(), CallState::HeaderSent);
    }

    #[test]
    fn test_late_entry_and_stray_terminator() {
        let mut session: CallSession<u32> = CallSession::new();
        assert_eq!(
            session.on_frame(FrameTag::EndOfTransmission, || 0),
            Transition::Ignored
        );
        assert_eq!(session.on_frame(FrameTag::Data, || 7), Transition::LateEntry);
        assert_eq!(session.state(), CallState::Streaming);
        assert_eq!(session.address(), Some(&7));
        assert!(session.abort());
        assert!(!session.abort());
    }
}

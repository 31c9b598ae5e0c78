//! Shared test doubles: in-memory links driven by the gateway's clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ysf2dmr::bridge::{Bridge, RoutingPolicy, SourceIdPolicy};
use ysf2dmr::config::TimingConfig;
use ysf2dmr::dmr::DmrData;
use ysf2dmr::gateway::Gateway;
use ysf2dmr::lookup::IdLookup;
use ysf2dmr::network::{DmrNetwork, RepeaterInfo, YsfNetwork};
use ysf2dmr::ysf::{FrameAddress, YsfFrame};
use ysf2dmr::{CallType, Callsign, DmrId, Result, Slot};

pub const IDS: &str = "\
1234567 G4KLX Jonathan
3100001 W1AW ARRL
";

/// YSF side: frames queued in `inbound` are read on the next tick.
#[derive(Default)]
pub struct FakeYsf {
    pub inbound: VecDeque<YsfFrame>,
    /// Frames written, with the link time they were written at.
    pub sent: Vec<(Duration, YsfFrame)>,
    pub polls: Vec<Duration>,
    pub now: Duration,
}

#[async_trait]
impl YsfNetwork for FakeYsf {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) {}

    fn read(&mut self) -> Option<YsfFrame> {
        self.inbound.pop_front()
    }

    async fn write(&mut self, frame: &YsfFrame) -> Result<()> {
        self.sent.push((self.now, *frame));
        Ok(())
    }

    async fn clock(&mut self, elapsed: Duration) {
        self.now += elapsed;
    }

    async fn write_poll(&mut self) -> Result<()> {
        self.polls.push(self.now);
        Ok(())
    }

    fn callsign(&self) -> &str {
        "EA7EE"
    }
}

/// DMR side: bursts queued in `inbound` are read on the next tick.
#[derive(Default)]
pub struct FakeDmr {
    pub inbound: VecDeque<DmrData>,
    pub sent: Vec<(Duration, DmrData)>,
    pub resets: Vec<(Duration, Slot)>,
    pub now: Duration,
}

#[async_trait]
impl DmrNetwork for FakeDmr {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) {}

    fn read(&mut self) -> Option<DmrData> {
        self.inbound.pop_front()
    }

    async fn write(&mut self, data: &DmrData) -> Result<()> {
        self.sent.push((self.now, *data));
        Ok(())
    }

    async fn clock(&mut self, elapsed: Duration) {
        self.now += elapsed;
    }

    fn reset(&mut self, slot: Slot) {
        self.resets.push((self.now, slot));
    }

    fn enable(&mut self, _enabled: bool) {}

    fn set_options(&mut self, _options: &str) {}

    fn set_config(&mut self, _info: RepeaterInfo) {}
}

pub fn routing() -> RoutingPolicy {
    RoutingPolicy {
        gateway_id: DmrId::new(2_140_001),
        gateway_callsign: Callsign::new("EA7EE"),
        source_id: SourceIdPolicy::Lookup,
        dst_id: DmrId::new(214),
        call_type: CallType::Group,
        slot: Slot::Two,
        color_code: 1,
    }
}

pub fn bridge(capacity: usize) -> Bridge {
    Bridge::new(routing(), Arc::new(IdLookup::from_text(IDS)), capacity)
}

pub fn gateway() -> Gateway<FakeYsf, FakeDmr> {
    Gateway::new(
        FakeYsf::default(),
        FakeDmr::default(),
        bridge(400),
        TimingConfig::default(),
    )
}

pub fn ysf_address() -> FrameAddress {
    FrameAddress {
        gateway: Callsign::new("YSFRPT"),
        source: Callsign::new("G4KLX"),
        destination: Callsign::new("ALL"),
    }
}

/// A YSF call of `voice_frames` V/D mode 2 frames, with or without its terminator.
pub fn ysf_call(voice_frames: u8, terminated: bool) -> Vec<YsfFrame> {
    use ysf2dmr::dmr::VoiceSlice;

    let address = ysf_address();
    let mut frames = vec![YsfFrame::encode_header(&address, 0)];
    for i in 0..voice_frames {
        let slices = [VoiceSlice::from_bytes([i; 9]); 5];
        frames.push(YsfFrame::encode_voice(&address, (i + 1) & 0x7F, i % 8, &slices));
    }
    if terminated {
        frames.push(YsfFrame::encode_terminator(&address, (voice_frames + 1) & 0x7F));
    }
    frames
}

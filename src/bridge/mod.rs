//! Mode conversion between YSF and DMR.
//!
//! Each direction has its own call session, outbound queue and emitter.
//! Inbound frames are decoded into tagged events which drive the session;
//! the emitters turn the queue back into frames when the scheduler asks.

pub mod emitter;
pub mod queue;
pub mod routing;
pub mod session;

pub use emitter::{DmrEmitter, YsfEmitter, DMR_HEADER_REPEATS};
pub use queue::{OutboundQueue, Segment, SLICE_MS};
pub use routing::{RoutingPolicy, SourceIdPolicy};
pub use session::{CallSession, CallState, Transition};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::dmr::{DecodedBurst, DmrData, EmbeddedCollector, LinkControl};
use crate::error::ProtocolError;
use crate::lookup::CallsignLookup;
use crate::types::FrameTag;
use crate::ysf::fich::DataType as YsfDataType;
use crate::ysf::{FrameAddress, FrameIndicator, YsfFrame};

/// Queue capacity in slices for a given jitter allowance.
///
/// Eight jitter windows of audio, and never less than one second.
pub fn queue_capacity(jitter: Duration) -> usize {
    let window = (jitter.as_millis() as u64 / SLICE_MS) as usize;
    (window * 8).max((1000 / SLICE_MS) as usize)
}

/// The bidirectional converter. Owned by the gateway loop.
pub struct Bridge {
    routing: RoutingPolicy,
    lookup: Arc<dyn CallsignLookup>,

    ysf_session: CallSession<LinkControl>,
    to_dmr: OutboundQueue<LinkControl>,
    dmr_emitter: DmrEmitter,

    dmr_session: CallSession<FrameAddress>,
    to_ysf: OutboundQueue<FrameAddress>,
    ysf_emitter: YsfEmitter,
    collector: EmbeddedCollector,
}

impl Bridge {
    pub fn new(routing: RoutingPolicy, lookup: Arc<dyn CallsignLookup>, capacity: usize) -> Self {
        let dmr_emitter = DmrEmitter::new(routing.slot, routing.color_code);
        Self {
            routing,
            lookup,
            ysf_session: CallSession::new(),
            to_dmr: OutboundQueue::new(capacity),
            dmr_emitter,
            dmr_session: CallSession::new(),
            to_ysf: OutboundQueue::new(capacity),
            ysf_emitter: YsfEmitter::new(),
            collector: EmbeddedCollector::new(),
        }
    }

    pub fn routing(&self) -> &RoutingPolicy {
        &self.routing
    }

    /// Feed a frame received from the YSF network.
    ///
    /// Returns the frame's tag, or `None` for frames that are not relayed.
    pub fn push_ysf(&mut self, frame: &YsfFrame) -> Result<Option<FrameTag>, ProtocolError> {
        let fich = frame.fich()?;
        let tag = match fich.fi {
            FrameIndicator::Header => FrameTag::Header,
            FrameIndicator::Communications => FrameTag::Data,
            FrameIndicator::Terminator => FrameTag::EndOfTransmission,
            FrameIndicator::Test => return Ok(None),
        };
        if tag == FrameTag::Data && fich.dt != YsfDataType::VdMode2 {
            debug!("YSF: ignoring {:?} communications frame", fich.dt);
            return Ok(None);
        }

        let routing = &self.routing;
        let lookup = self.lookup.as_ref();
        let source = match tag {
            FrameTag::Data => frame.source(),
            _ => frame
                .decode_header_payload()
                .map(|(source, _)| source)
                .unwrap_or_else(|_| frame.source()),
        };

        let (frames, duration) = (self.ysf_session.frames(), self.ysf_session.duration());
        let transition = self
            .ysf_session
            .on_frame(tag, || routing.dmr_route(&source, lookup));
        let lc = self.ysf_session.address().copied();

        match (transition, lc) {
            (Transition::Started, Some(lc)) => {
                info!("YSF call from {} to {}, relaying as {}", source, frame.destination(), lc);
                self.to_dmr.push_header(lc);
            }
            (Transition::Restarted, Some(lc)) => {
                info!("YSF call restarted by {}, relaying as {}", source, lc);
                self.to_dmr.push_end();
                self.to_dmr.push_header(lc);
            }
            (Transition::LateEntry, Some(lc)) => {
                info!("YSF late entry from {}, relaying as {}", source, lc);
                self.to_dmr.push_header(lc);
            }
            (Transition::Ended, _) => {
                info!(
                    "YSF end of transmission from {}, {} frames in {:.1}s",
                    source,
                    frames,
                    duration.unwrap_or_default().as_secs_f64()
                );
                self.to_dmr.push_end();
            }
            (Transition::Duplicate, _) => debug!("YSF: duplicate header ignored"),
            _ => {}
        }

        if tag == FrameTag::Data && self.ysf_session.is_active() {
            for slice in frame.slices() {
                self.to_dmr.push_slice(slice);
            }
        }
        Ok(Some(tag))
    }

    /// Feed a burst received from the DMR network.
    ///
    /// Returns the burst's tag, or `None` for traffic that is not relayed.
    pub fn push_dmr(&mut self, data: &DmrData) -> Result<Option<FrameTag>, ProtocolError> {
        if !self.routing.accepts(data.slot, data.dst, data.call_type) {
            return Ok(None);
        }

        let decoded = data.burst.decode(data.data_type)?;
        let Some(tag) = decoded.tag() else {
            debug!("DMR: ignoring {:?} burst", data.data_type);
            return Ok(None);
        };

        let (src, dst, call_type) = match &decoded {
            DecodedBurst::Header(lc) | DecodedBurst::Terminator(lc) => (lc.src, lc.dst, lc.call_type),
            _ => (data.src, data.dst, data.call_type),
        };

        let routing = &self.routing;
        let lookup = self.lookup.as_ref();
        let (frames, duration) = (self.dmr_session.frames(), self.dmr_session.duration());
        let transition = self
            .dmr_session
            .on_frame(tag, || routing.ysf_address(src, dst, call_type, lookup));
        let address = self.dmr_session.address().copied();

        match (transition, address) {
            (Transition::Started, Some(address)) => {
                info!("DMR call from {} to {}", address.source, address.destination);
                self.collector.reset();
                self.to_ysf.push_header(address);
            }
            (Transition::Restarted, Some(address)) => {
                info!("DMR call restarted by {}", address.source);
                self.collector.reset();
                self.to_ysf.push_end();
                self.to_ysf.push_header(address);
            }
            (Transition::LateEntry, Some(address)) => {
                info!("DMR late entry from {} to {}", address.source, address.destination);
                self.collector.reset();
                self.to_ysf.push_header(address);
            }
            (Transition::Ended, _) => {
                info!(
                    "DMR end of transmission from {}, {} bursts in {:.1}s",
                    src,
                    frames,
                    duration.unwrap_or_default().as_secs_f64()
                );
                self.to_ysf.push_end();
            }
            (Transition::Duplicate, _) => debug!("DMR: duplicate header ignored"),
            _ => {}
        }

        if let DecodedBurst::Voice { slices, fragment } = decoded {
            if !self.dmr_session.is_active() {
                return Ok(Some(tag));
            }
            if let Some(lc) = fragment.and_then(|f| self.collector.push(&f)) {
                if lc.src != src || lc.dst != dst {
                    debug!("DMR: embedded LC {} differs from network addressing", lc);
                }
            }
            for slice in slices {
                self.to_ysf.push_slice(slice);
            }
        }
        Ok(Some(tag))
    }

    /// Next DMR burst to send, if one is ready.
    pub fn next_dmr(&mut self) -> Option<DmrData> {
        self.dmr_emitter.next(&mut self.to_dmr)
    }

    /// Next YSF frame to send, if one is ready.
    pub fn next_ysf(&mut self) -> Option<YsfFrame> {
        self.ysf_emitter.next(&mut self.to_ysf)
    }

    /// Whether a YSF-originated call is in progress.
    pub fn ysf_call_active(&self) -> bool {
        self.ysf_session.is_active()
    }

    /// Whether a DMR-originated call is in progress.
    pub fn dmr_call_active(&self) -> bool {
        self.dmr_session.is_active()
    }

    /// Close a stalled YSF-originated call: DMR gets fill bursts and a terminator.
    pub fn abort_ysf_call(&mut self) -> bool {
        let aborted = self.ysf_session.abort();
        if aborted {
            self.to_dmr.push_end();
        }
        aborted
    }

    /// Close a stalled DMR-originated call: YSF gets a terminator.
    pub fn abort_dmr_call(&mut self) -> bool {
        let aborted = self.dmr_session.abort();
        if aborted {
            self.collector.reset();
            self.to_ysf.push_end();
        }
        aborted
    }

    /// Drop everything queued in both directions.
    pub fn clear(&mut self) {
        self.ysf_session.abort();
        self.dmr_session.abort();
        self.to_dmr.clear();
        self.to_ysf.clear();
        self.dmr_emitter.reset();
        self.ysf_emitter.reset();
        self.collector.reset();
    }

    /// Slices waiting for the DMR side.
    pub fn dmr_backlog(&self) -> usize {
        self.to_dmr.slices()
    }

    /// Slices waiting for the YSF side.
    pub fn ysf_backlog(&self) -> usize {
        self.to_ysf.slices()
    }

    /// Voice slices lost to queue overflow in both directions.
    pub fn overflow_drops(&self) -> u64 {
        self.to_dmr.dropped() + self.to_ysf.dropped()
    }

    /// Whether any frames remain to be emitted toward DMR.
    pub fn has_pending_dmr(&self) -> bool {
        !self.to_dmr.is_empty()
    }

    /// Whether any frames remain to be emitted toward YSF.
    pub fn has_pending_ysf(&self) -> bool {
        !self.to_ysf.is_empty()
    }
}

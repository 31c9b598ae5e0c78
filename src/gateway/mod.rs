//! The scheduling loop.
//!
//! One tick drains both links into the bridge, runs the watchdogs, emits at
//! most one frame per direction when its pacing interval has passed, polls
//! the repeater and clocks both links. Everything is owned by the loop, so
//! nothing here is shared or locked.

mod timer;

pub use timer::{PacingClock, Timer};

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::config::TimingConfig;
use crate::error::{Error, Result};
use crate::network::{DmrNetwork, YsfNetwork};
use crate::types::FrameTag;

/// Counters kept by the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub ysf_received: u64,
    pub dmr_received: u64,
    pub ysf_sent: u64,
    pub dmr_sent: u64,
    /// Frames that failed to decode.
    pub dropped: u64,
    pub polls: u64,
    /// Voice slices lost to outbound queue overflow.
    pub overflow_drops: u64,
    pub dmr_watchdog_expiries: u64,
    pub ysf_watchdog_expiries: u64,
}

/// The gateway: both links, the bridge and the clocks that pace them.
pub struct Gateway<Y, D> {
    ysf: Y,
    dmr: D,
    bridge: Bridge,
    timing: TimingConfig,

    dmr_pacing: PacingClock,
    ysf_pacing: PacingClock,
    dmr_watchdog: Timer,
    ysf_watchdog: Timer,
    poll: Timer,

    stats: GatewayStats,
}

impl<Y: YsfNetwork, D: DmrNetwork> Gateway<Y, D> {
    pub fn new(ysf: Y, dmr: D, bridge: Bridge, timing: TimingConfig) -> Self {
        Self {
            ysf,
            dmr,
            bridge,
            dmr_pacing: PacingClock::new(timing.dmr_interval),
            ysf_pacing: PacingClock::new(timing.ysf_interval),
            dmr_watchdog: Timer::new(timing.watchdog),
            ysf_watchdog: Timer::new(timing.watchdog),
            poll: Timer::new(timing.poll_interval),
            timing,
            stats: GatewayStats::default(),
        }
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn ysf(&self) -> &Y {
        &self.ysf
    }

    pub fn ysf_mut(&mut self) -> &mut Y {
        &mut self.ysf
    }

    pub fn dmr(&self) -> &D {
        &self.dmr
    }

    pub fn dmr_mut(&mut self) -> &mut D {
        &mut self.dmr
    }

    /// Open both links. Either failing is fatal.
    pub async fn open(&mut self) -> Result<()> {
        self.ysf.open().await?;
        if let Err(e) = self.dmr.open().await {
            self.ysf.close().await;
            return Err(e);
        }
        self.send_poll().await;
        self.poll.start();
        Ok(())
    }

    pub async fn close(&mut self) {
        self.ysf.close().await;
        self.dmr.close().await;
    }

    /// Run ticks until `shutdown` completes.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        info!("Starting ysf2dmr-{}", crate::VERSION);

        let mut last = Instant::now();
        loop {
            let started = Instant::now();
            self.tick(started - last).await;
            last = started;

            let pause = self.timing.tick_floor.saturating_sub(started.elapsed());
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
        let stats = &self.stats;
        info!(
            "Gateway stopping: {} DMR and {} YSF frames sent, {} dropped, {} slices lost to overflow, backlog {} DMR / {} YSF",
            stats.dmr_sent,
            stats.ysf_sent,
            stats.dropped,
            stats.overflow_drops,
            self.bridge.dmr_backlog(),
            self.bridge.ysf_backlog()
        );
    }

    /// One scheduling iteration covering `elapsed` since the previous one.
    pub async fn tick(&mut self, elapsed: Duration) {
        self.dmr_pacing.clock(elapsed);
        self.ysf_pacing.clock(elapsed);
        self.dmr_watchdog.clock(elapsed);
        self.ysf_watchdog.clock(elapsed);
        self.poll.clock(elapsed);

        self.drain_ysf();
        self.drain_dmr();
        self.stats.overflow_drops = self.bridge.overflow_drops();
        self.check_watchdogs();
        self.emit().await;

        if self.poll.has_expired() {
            self.send_poll().await;
            self.poll.start();
        }

        self.ysf.clock(elapsed).await;
        self.dmr.clock(elapsed).await;
    }

    fn drain_ysf(&mut self) {
        while let Some(frame) = self.ysf.read() {
            match self.bridge.push_ysf(&frame) {
                Ok(Some(tag)) => {
                    self.stats.ysf_received += 1;
                    debug!(
                        "YSF: received {} from {} to {}, counter {}",
                        tag,
                        frame.source(),
                        frame.destination(),
                        frame.counter()
                    );
                    if tag == FrameTag::EndOfTransmission || !self.bridge.ysf_call_active() {
                        self.ysf_watchdog.stop();
                    } else {
                        self.ysf_watchdog.start();
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.dropped += 1;
                    debug!("YSF: dropping frame: {}", e);
                }
            }
        }
    }

    fn drain_dmr(&mut self) {
        while let Some(data) = self.dmr.read() {
            debug!(
                "DMR: received slot {}, {} -> {}, {:?}, N {}, BER {}, RSSI {}",
                data.slot.number(),
                data.src,
                data.dst,
                data.data_type,
                data.n,
                data.ber,
                data.rssi
            );
            match self.bridge.push_dmr(&data) {
                Ok(Some(tag)) => {
                    self.stats.dmr_received += 1;
                    if tag == FrameTag::EndOfTransmission || !self.bridge.dmr_call_active() {
                        self.dmr_watchdog.stop();
                    } else {
                        self.dmr_watchdog.start();
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    self.stats.dropped += 1;
                    debug!("DMR: dropping burst: {}", e);
                }
            }
        }
    }

    fn check_watchdogs(&mut self) {
        if self.dmr_watchdog.has_expired() {
            let slot = self.bridge.routing().slot;
            warn!("DMR: network watchdog expired, resetting slot {}", slot.number());
            self.dmr.reset(slot);
            self.bridge.abort_dmr_call();
            self.dmr_watchdog.stop();
            self.stats.dmr_watchdog_expiries += 1;
        }

        if self.ysf_watchdog.has_expired() {
            warn!("YSF: network watchdog expired, ending the call");
            self.bridge.abort_ysf_call();
            self.ysf_watchdog.stop();
            self.stats.ysf_watchdog_expiries += 1;
        }
    }

    async fn emit(&mut self) {
        if self.dmr_pacing.is_due() {
            if let Some(data) = self.bridge.next_dmr() {
                if let Err(e) = self.dmr.write(&data).await {
                    log_write_error("DMR", &e);
                }
                self.dmr_pacing.restart();
                self.stats.dmr_sent += 1;
            }
        }

        if self.ysf_pacing.is_due() {
            if let Some(frame) = self.bridge.next_ysf() {
                if let Err(e) = self.ysf.write(&frame).await {
                    log_write_error("YSF", &e);
                }
                self.ysf_pacing.restart();
                self.stats.ysf_sent += 1;
            }
        }
    }

    async fn send_poll(&mut self) {
        match self.ysf.write_poll().await {
            Ok(()) => self.stats.polls += 1,
            Err(e) => warn!("YSF: poll failed: {}", e),
        }
    }
}

fn log_write_error(side: &str, e: &Error) {
    if e.is_recoverable() {
        warn!("{}: write failed, frame dropped: {}", side, e);
    } else {
        error!("{}: write failed: {}", side, e);
    }
}

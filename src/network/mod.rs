//! Network links to the YSF repeater and the DMR master.
//!
//! Both links are polled, never awaited for reads: `clock` drains whatever
//! the socket holds into a receive queue and runs the link's own timers, and
//! `read` pops from that queue. The gateway loop owns both links exclusively.

mod dmrd;
mod homebrew;
mod ysf;

pub use dmrd::{DmrdPacket, DMRD_LENGTH};
pub use homebrew::{HomebrewConfig, HomebrewNetwork, RepeaterInfo, Status as LoginStatus};
pub use ysf::{YsfLink, YsfLinkConfig, POLL_LENGTH};

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::dmr::DmrData;
use crate::error::{Result, TransportError};
use crate::types::Slot;
use crate::ysf::YsfFrame;

/// Size of the datagram receive buffer.
pub(crate) const RECEIVE_BUFFER_SIZE: usize = 1024;

/// The DMR side of the gateway.
#[async_trait]
pub trait DmrNetwork: Send {
    /// Bind the local socket and begin logging in.
    async fn open(&mut self) -> Result<()>;

    /// Log out and release the socket.
    async fn close(&mut self);

    /// Next received burst, if any.
    fn read(&mut self) -> Option<DmrData>;

    /// Send one burst.
    async fn write(&mut self, data: &DmrData) -> Result<()>;

    /// Drain the socket and run the link timers.
    async fn clock(&mut self, elapsed: Duration);

    /// Start a fresh stream on `slot` and forget anything buffered for it.
    fn reset(&mut self, slot: Slot);

    /// Enable or suspend traffic without dropping the login.
    fn enable(&mut self, enabled: bool);

    /// Options string sent to the master after configuration.
    fn set_options(&mut self, options: &str);

    /// Station details sent to the master during login.
    fn set_config(&mut self, info: RepeaterInfo);
}

/// The YSF side of the gateway.
#[async_trait]
pub trait YsfNetwork: Send {
    async fn open(&mut self) -> Result<()>;

    async fn close(&mut self);

    /// Next received frame, if any.
    fn read(&mut self) -> Option<YsfFrame>;

    async fn write(&mut self, frame: &YsfFrame) -> Result<()>;

    /// Drain the socket.
    async fn clock(&mut self, elapsed: Duration);

    /// Keepalive poll carrying the gateway callsign.
    async fn write_poll(&mut self) -> Result<()>;

    fn callsign(&self) -> &str;
}

/// Resolve `host:port`, preferring the first address returned.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let target = format!("{host}:{port}");
    let first = tokio::net::lookup_host(&target)
        .await
        .map_err(|e| TransportError::ResolveFailed(format!("{target}: {e}")))?
        .next();
    first.ok_or_else(|| TransportError::ResolveFailed(target).into())
}

/// Local bind address in the same family as `remote`.
pub(crate) fn bind_address(remote: &SocketAddr, port: u16) -> SocketAddr {
    if remote.is_ipv6() {
        SocketAddr::from(([0u16; 8], port))
    } else {
        SocketAddr::from(([0u8; 4], port))
    }
}

/// Bind a non-blocking UDP socket.
pub(crate) async fn bind(addr: SocketAddr) -> Result<tokio::net::UdpSocket> {
    tokio::net::UdpSocket::bind(addr).await.map_err(|e| {
        TransportError::BindFailed {
            addr,
            reason: e.to_string(),
        }
        .into()
    })
}

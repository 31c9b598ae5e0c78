//! YSF link to the repeater (or MMDVMHost) feeding the gateway.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use super::{bind, bind_address, resolve, YsfNetwork, RECEIVE_BUFFER_SIZE};
use crate::error::{Result, TransportError};
use crate::types::{Callsign, CALLSIGN_LENGTH};
use crate::ysf::{YsfFrame, FRAME_TAG};

const POLL_TAG: &[u8; 4] = b"YSFP";

/// Length of a `YSFP` poll.
pub const POLL_LENGTH: usize = POLL_TAG.len() + CALLSIGN_LENGTH;

/// Where the repeater lives and how to reach it.
#[derive(Debug, Clone)]
pub struct YsfLinkConfig {
    pub callsign: String,
    pub address: String,
    pub port: u16,
    pub local_address: String,
    pub local_port: u16,
    pub debug: bool,
}

/// UDP link carrying `YSFD` frames and `YSFP` polls.
pub struct YsfLink {
    config: YsfLinkConfig,
    socket: Option<UdpSocket>,
    remote: Option<SocketAddr>,
    received: VecDeque<YsfFrame>,
}

impl YsfLink {
    pub fn new(config: YsfLinkConfig) -> Self {
        Self {
            config,
            socket: None,
            remote: None,
            received: VecDeque::new(),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn poll_message(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(POLL_LENGTH);
        buf.put_slice(POLL_TAG);
        buf.put_slice(Callsign::new(&self.config.callsign).as_bytes());
        buf
    }

    async fn send(&self, message: &[u8]) -> Result<()> {
        let (Some(socket), Some(remote)) = (&self.socket, self.remote) else {
            return Err(TransportError::NotOpen.into());
        };
        if self.config.debug {
            trace!("YSF network sent: {}", hex::encode(message));
        }
        socket
            .send_to(message, remote)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    fn handle(&mut self, packet: &[u8]) {
        if self.config.debug {
            trace!("YSF network received: {}", hex::encode(packet));
        }
        if packet.starts_with(FRAME_TAG) {
            match YsfFrame::from_slice(packet) {
                Ok(frame) => self.received.push_back(frame),
                Err(e) => debug!("YSF: dropping frame: {}", e),
            }
        } else if packet.starts_with(POLL_TAG) {
            trace!("YSF: poll reply");
        } else {
            debug!("YSF: unexpected {} byte packet", packet.len());
        }
    }
}

#[async_trait]
impl YsfNetwork for YsfLink {
    async fn open(&mut self) -> Result<()> {
        info!(
            "Opening YSF network connection to {}:{}",
            self.config.address, self.config.port
        );
        let remote = resolve(&self.config.address, self.config.port).await?;
        let local = if self.config.local_address.is_empty() {
            bind_address(&remote, self.config.local_port)
        } else {
            resolve(&self.config.local_address, self.config.local_port).await?
        };
        self.socket = Some(bind(local).await?);
        self.remote = Some(remote);
        Ok(())
    }

    async fn close(&mut self) {
        info!("Closing YSF network connection");
        self.socket = None;
        self.received.clear();
    }

    fn read(&mut self) -> Option<YsfFrame> {
        self.received.pop_front()
    }

    async fn write(&mut self, frame: &YsfFrame) -> Result<()> {
        self.send(frame.as_bytes()).await
    }

    async fn clock(&mut self, _elapsed: Duration) {
        let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
        loop {
            let received = match &self.socket {
                Some(socket) => socket.try_recv_from(&mut buf),
                None => return,
            };
            match received {
                Ok((len, addr)) if Some(addr) == self.remote => self.handle(&buf[..len]),
                Ok((_, addr)) => debug!("YSF: ignoring packet from {}", addr),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("YSF: receive error: {}", e);
                    break;
                }
            }
        }
    }

    async fn write_poll(&mut self) -> Result<()> {
        self.send(&self.poll_message()).await
    }

    fn callsign(&self) -> &str {
        &self.config.callsign
    }
}

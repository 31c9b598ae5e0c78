//! DMR link to a Homebrew (MMDVM) master.
//!
//! Login runs `RPTL` -> `RPTACK`+salt -> `RPTK` -> `RPTACK` -> `RPTC` ->
//! `RPTACK` [-> `RPTO` -> `RPTACK`]. Once running, `RPTPING` is sent every
//! retry period and a missing `MSTPONG` for the timeout period starts the
//! login over.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use sha2::{Digest, Sha256};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use super::dmrd::{DmrdPacket, DMRD_TAG};
use super::{bind, bind_address, resolve, DmrNetwork, RECEIVE_BUFFER_SIZE};
use crate::dmr::{DataType, DmrData};
use crate::error::{Result, TransportError};
use crate::gateway::Timer;
use crate::types::Slot;

const RETRY_PERIOD: Duration = Duration::from_secs(10);
const TIMEOUT_PERIOD: Duration = Duration::from_secs(60);

/// Length of the `RPTC` configuration message.
pub const CONFIG_LENGTH: usize = 302;

const SOFTWARE: &str = concat!("ysf2dmr-", env!("CARGO_PKG_VERSION"));
const PACKAGE: &str = "ysf2dmr";

/// Station details reported to the master.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepeaterInfo {
    pub callsign: String,
    pub rx_frequency: u32,
    pub tx_frequency: u32,
    pub power: u32,
    pub color_code: u8,
    pub latitude: f32,
    pub longitude: f32,
    pub height: i32,
    pub location: String,
    pub description: String,
    pub url: String,
}

impl RepeaterInfo {
    /// Fixed-width text fields of `RPTC`, after the tag and repeater id.
    fn put_fields(&self, buf: &mut BytesMut, slots: char) {
        put_field(buf, &self.callsign, 8);
        put_field(buf, &format!("{:09}", self.rx_frequency), 9);
        put_field(buf, &format!("{:09}", self.tx_frequency), 9);
        put_field(buf, &format!("{:02}", self.power), 2);
        put_field(buf, &format!("{:02}", self.color_code), 2);
        put_field(buf, &format!("{:08.6}", self.latitude), 8);
        put_field(buf, &format!("{:09.6}", self.longitude), 9);
        put_field(buf, &format!("{:03}", self.height), 3);
        put_field(buf, &self.location, 20);
        put_field(buf, &self.description, 19);
        buf.put_u8(slots as u8);
        put_field(buf, &self.url, 124);
        put_field(buf, SOFTWARE, 40);
        put_field(buf, PACKAGE, 40);
    }
}

/// Left-aligned, space-padded, truncated to `width`.
fn put_field(buf: &mut BytesMut, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let len = bytes.len().min(width);
    buf.put_slice(&bytes[..len]);
    buf.put_bytes(b' ', width - len);
}

/// Connection parameters for the master.
#[derive(Debug, Clone)]
pub struct HomebrewConfig {
    pub address: String,
    pub port: u16,
    /// Local UDP port; 0 picks an ephemeral one.
    pub local_port: u16,
    /// Repeater ID, up to nine digits.
    pub id: u32,
    pub password: String,
    pub slot1: bool,
    pub slot2: bool,
    /// Hex dump every packet at trace level.
    pub debug: bool,
}

impl HomebrewConfig {
    fn slot_enabled(&self, slot: Slot) -> bool {
        match slot {
            Slot::One => self.slot1,
            Slot::Two => self.slot2,
        }
    }

    fn slots(&self) -> char {
        match (self.slot1, self.slot2) {
            (true, true) => '3',
            (true, false) => '1',
            (false, true) => '2',
            (false, false) => '0',
        }
    }
}

/// Login progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Closed,
    WaitingLogin,
    WaitingAuthorisation,
    WaitingConfig,
    WaitingOptions,
    Running,
}

/// Homebrew protocol client.
pub struct HomebrewNetwork {
    config: HomebrewConfig,
    info: RepeaterInfo,
    options: Option<String>,
    enabled: bool,

    socket: Option<UdpSocket>,
    master: Option<SocketAddr>,
    status: Status,
    salt: [u8; 4],
    retry: Timer,
    timeout: Timer,

    received: VecDeque<DmrData>,
    stream_ids: [u32; 2],
    last_written: [Option<DataType>; 2],
    sequence: u8,
}

fn slot_index(slot: Slot) -> usize {
    match slot {
        Slot::One => 0,
        Slot::Two => 1,
    }
}

fn new_stream_id() -> u32 {
    rand::random()
}

impl HomebrewNetwork {
    pub fn new(config: HomebrewConfig) -> Self {
        Self {
            config,
            info: RepeaterInfo::default(),
            options: None,
            enabled: true,
            socket: None,
            master: None,
            status: Status::Closed,
            salt: [0; 4],
            retry: Timer::new(RETRY_PERIOD),
            timeout: Timer::new(TIMEOUT_PERIOD),
            received: VecDeque::new(),
            stream_ids: [new_stream_id(), new_stream_id()],
            last_written: [None; 2],
            sequence: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Tag, repeater id, body.
    fn message(&self, tag: &[u8], body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(tag.len() + 4 + body.len());
        buf.put_slice(tag);
        buf.put_u32(self.config.id);
        buf.put_slice(body);
        buf
    }

    fn config_message(&self) -> BytesMut {
        let mut buf = self.message(b"RPTC", &[]);
        self.info.put_fields(&mut buf, self.config.slots());
        buf
    }

    fn authorisation_message(&self) -> BytesMut {
        let mut hasher = Sha256::new();
        hasher.update(self.salt);
        hasher.update(self.config.password.as_bytes());
        self.message(b"RPTK", &hasher.finalize())
    }

    /// What to (re)send for the current login stage.
    fn stage_message(&self) -> Option<BytesMut> {
        match self.status {
            Status::Closed => None,
            Status::WaitingLogin => Some(self.message(b"RPTL", &[])),
            Status::WaitingAuthorisation => Some(self.authorisation_message()),
            Status::WaitingConfig => Some(self.config_message()),
            Status::WaitingOptions => self
                .options
                .as_ref()
                .map(|options| self.message(b"RPTO", options.as_bytes())),
            Status::Running => Some(self.message(b"RPTPING", &[])),
        }
    }

    async fn send(&self, message: &[u8]) -> Result<()> {
        let (Some(socket), Some(master)) = (&self.socket, self.master) else {
            return Err(TransportError::NotOpen.into());
        };
        if self.config.debug {
            trace!("DMR network sent: {}", hex::encode(message));
        }
        socket
            .send_to(message, master)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    /// Send the current stage's message and restart the retry timer.
    async fn send_stage(&mut self) {
        if let Some(message) = self.stage_message() {
            if let Err(e) = self.send(&message).await {
                warn!("DMR: failed to send to the master: {}", e);
            }
        }
        self.retry.start();
    }

    async fn advance(&mut self, status: Status) {
        debug!("DMR: {:?} -> {:?}", self.status, status);
        self.status = status;
        self.send_stage().await;
    }

    fn logged_in(&mut self) {
        info!("DMR: logged into the master successfully");
        self.status = Status::Running;
        self.timeout.start();
        self.retry.start();
    }

    async fn acknowledged(&mut self, packet: &[u8]) {
        match self.status {
            Status::WaitingLogin => {
                if packet.len() < 10 {
                    warn!("DMR: login acknowledgement without a salt");
                    return;
                }
                self.salt.copy_from_slice(&packet[6..10]);
                self.advance(Status::WaitingAuthorisation).await;
            }
            Status::WaitingAuthorisation => self.advance(Status::WaitingConfig).await,
            Status::WaitingConfig if self.options.is_some() => {
                self.advance(Status::WaitingOptions).await
            }
            Status::WaitingConfig | Status::WaitingOptions => self.logged_in(),
            status => debug!("DMR: unexpected acknowledgement while {:?}", status),
        }
    }

    fn receive_data(&mut self, packet: &[u8]) {
        if self.status != Status::Running || !self.enabled {
            return;
        }
        match DmrdPacket::decode(packet) {
            Ok(packet) if !self.config.slot_enabled(packet.data.slot) => {
                debug!("DMR: dropping traffic on disabled slot {}", packet.data.slot.number())
            }
            Ok(packet) => self.received.push_back(packet.data),
            Err(e) => debug!("DMR: invalid DMRD packet: {}", e),
        }
    }

    async fn handle(&mut self, packet: &[u8]) {
        if self.config.debug {
            trace!("DMR network received: {}", hex::encode(packet));
        }

        if packet.starts_with(DMRD_TAG) {
            self.receive_data(packet);
        } else if packet.starts_with(b"MSTNAK") {
            if self.status == Status::Running {
                warn!("DMR: the master is restarting, logging back in");
            } else {
                warn!("DMR: login to the master has failed, retrying");
            }
            self.status = Status::WaitingLogin;
            self.timeout.stop();
            self.retry.start();
        } else if packet.starts_with(b"RPTACK") {
            self.acknowledged(packet).await;
        } else if packet.starts_with(b"MSTCL") {
            warn!("DMR: the master is closing down");
            self.status = Status::WaitingLogin;
            self.timeout.stop();
            self.retry.start();
        } else if packet.starts_with(b"MSTPONG") {
            if self.status == Status::Running {
                self.timeout.start();
            }
        } else if packet.starts_with(b"RPTSBKN") {
            debug!("DMR: ignoring beacon request");
        } else {
            debug!("DMR: unexpected packet from the master: {}", hex::encode(packet));
        }
    }
}

#[async_trait]
impl DmrNetwork for HomebrewNetwork {
    async fn open(&mut self) -> Result<()> {
        info!(
            "Opening DMR network connection to {}:{}",
            self.config.address, self.config.port
        );
        let master = resolve(&self.config.address, self.config.port).await?;
        let socket = bind(bind_address(&master, self.config.local_port)).await?;
        self.master = Some(master);
        self.socket = Some(socket);
        self.advance(Status::WaitingLogin).await;
        Ok(())
    }

    async fn close(&mut self) {
        if self.status == Status::Running {
            if let Err(e) = self.send(&self.message(b"RPTCL", &[])).await {
                warn!("DMR: failed to send logout: {}", e);
            }
        }
        info!("Closing DMR network connection");
        self.socket = None;
        self.status = Status::Closed;
        self.retry.stop();
        self.timeout.stop();
        self.received.clear();
    }

    fn read(&mut self) -> Option<DmrData> {
        self.received.pop_front()
    }

    async fn write(&mut self, data: &DmrData) -> Result<()> {
        if self.status != Status::Running || !self.enabled {
            return Ok(());
        }
        if !self.config.slot_enabled(data.slot) {
            debug!("DMR: not sending on disabled slot {}", data.slot.number());
            return Ok(());
        }

        let index = slot_index(data.slot);
        if data.data_type == DataType::VoiceLcHeader
            && self.last_written[index] != Some(DataType::VoiceLcHeader)
        {
            self.stream_ids[index] = new_stream_id();
        }
        self.last_written[index] = Some(data.data_type);

        let packet = DmrdPacket {
            sequence: self.sequence,
            repeater_id: self.config.id,
            stream_id: self.stream_ids[index],
            data: *data,
        };
        self.sequence = self.sequence.wrapping_add(1);
        self.send(&packet.encode()).await
    }

    async fn clock(&mut self, elapsed: Duration) {
        if self.status == Status::Closed {
            return;
        }
        self.retry.clock(elapsed);
        self.timeout.clock(elapsed);

        let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
        loop {
            let received = match &self.socket {
                Some(socket) => socket.try_recv_from(&mut buf),
                None => return,
            };
            match received {
                Ok((len, addr)) if Some(addr) == self.master => self.handle(&buf[..len]).await,
                Ok((_, addr)) => debug!("DMR: ignoring packet from {}", addr),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("DMR: receive error: {}", e);
                    break;
                }
            }
        }

        if self.status == Status::Running && self.timeout.has_expired() {
            warn!("DMR: connection to the master has timed out, logging in again");
            self.timeout.stop();
            self.advance(Status::WaitingLogin).await;
        }

        if self.retry.has_expired() {
            self.send_stage().await;
        }
    }

    fn reset(&mut self, slot: Slot) {
        let index = slot_index(slot);
        self.stream_ids[index] = new_stream_id();
        self.last_written[index] = None;
        self.received.retain(|data| data.slot != slot);
    }

    fn enable(&mut self, enabled: bool) {
        if !enabled {
            self.received.clear();
        }
        self.enabled = enabled;
    }

    fn set_options(&mut self, options: &str) {
        self.options = (!options.is_empty()).then(|| options.to_string());
    }

    fn set_config(&mut self, info: RepeaterInfo) {
        self.info = info;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmr::{Burst, LinkControl};
    use crate::types::{CallType, DmrId};

    const PASSWORD: &str = "passw0rd";

    fn info() -> RepeaterInfo {
        RepeaterInfo {
            callsign: "EA7EE".into(),
            rx_frequency: 430_450_000,
            tx_frequency: 439_450_000,
            power: 1,
            color_code: 1,
            latitude: 37.25,
            longitude: -6.5,
            height: 12,
            location: "Huelva".into(),
            description: "YSF gateway".into(),
            url: "https://example.org".into(),
        }
    }

    fn config(port: u16) -> HomebrewConfig {
        HomebrewConfig {
            address: "127.0.0.1".into(),
            port,
            local_port: 0,
            id: 214_000_101,
            password: PASSWORD.into(),
            slot1: false,
            slot2: true,
            debug: true,
        }
    }

    async fn recv(master: &UdpSocket) -> (Vec<u8>, SocketAddr) {
        let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
        let (len, addr) = tokio::time::timeout(Duration::from_secs(2), master.recv_from(&mut buf))
            .await
            .expect("no packet from the gateway")
            .unwrap();
        (buf[..len].to_vec(), addr)
    }

    async fn pump(network: &mut HomebrewNetwork, done: impl Fn(&HomebrewNetwork) -> bool) {
        for _ in 0..200 {
            network.clock(Duration::from_millis(1)).await;
            if done(network) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("link never reached the expected state");
    }

    #[test]
    fn test_config_message_layout() {
        let mut network = HomebrewNetwork::new(config(62031));
        network.set_config(info());
        let message = network.config_message();
        assert_eq!(message.len(), CONFIG_LENGTH);
        assert_eq!(&message[0..4], b"RPTC");
        assert_eq!(&message[8..16], b"EA7EE   ");
        assert_eq!(&message[16..25], b"430450000");
        assert_eq!(&message[34..38], b"0101");
        assert_eq!(&message[38..46], b"37.25000");
        assert_eq!(&message[46..55], b"-6.500000");
        assert_eq!(&message[55..58], b"012");
        assert_eq!(message[97], b'2');
    }

    #[tokio::test]
    async fn test_login_and_traffic() {
        let master = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut network = HomebrewNetwork::new(config(master.local_addr().unwrap().port()));
        network.set_config(info());
        network.open().await.unwrap();

        let (login, peer) = recv(&master).await;
        assert_eq!(login, b"RPTL\x0C\xC1\x61\xE5");
        assert_eq!(network.status(), Status::WaitingLogin);

        let salt = [0x12, 0x34, 0x56, 0x78];
        master.send_to(&[b"RPTACK".as_slice(), &salt].concat(), peer).await.unwrap();
        pump(&mut network, |n| n.status() == Status::WaitingAuthorisation).await;

        let (auth, _) = recv(&master).await;
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(PASSWORD.as_bytes());
        assert_eq!(&auth[0..4], b"RPTK");
        assert_eq!(&auth[8..], hasher.finalize().as_slice());

        master.send_to(b"RPTACK", peer).await.unwrap();
        pump(&mut network, |n| n.status() == Status::WaitingConfig).await;
        let (config, _) = recv(&master).await;
        assert_eq!(config.len(), CONFIG_LENGTH);

        master.send_to(b"RPTACK", peer).await.unwrap();
        pump(&mut network, HomebrewNetwork::is_running).await;

        let lc = LinkControl::new(CallType::Group, DmrId::new(3_100_001), DmrId::new(214));
        let header = DmrData::new(
            Slot::Two,
            lc.src,
            lc.dst,
            lc.call_type,
            DataType::VoiceLcHeader,
            Burst::encode_header(&lc, 1),
        );
        network.write(&header).await.unwrap();
        network.write(&header).await.unwrap();
        let (first, _) = recv(&master).await;
        let (second, _) = recv(&master).await;
        let first = DmrdPacket::decode(&first).unwrap();
        let second = DmrdPacket::decode(&second).unwrap();
        assert_eq!(first.data, header);
        assert_eq!(first.stream_id, second.stream_id, "repeated headers share a stream");
        assert_eq!(second.sequence, first.sequence.wrapping_add(1));

        let inbound = DmrdPacket {
            sequence: 0,
            repeater_id: 1,
            stream_id: 9,
            data: header,
        };
        master.send_to(&inbound.encode(), peer).await.unwrap();
        pump(&mut network, |n| !n.received.is_empty()).await;
        assert_eq!(network.read(), Some(header));
        assert_eq!(network.read(), None);

        network.close().await;
        let (logout, _) = recv(&master).await;
        assert_eq!(&logout[0..5], b"RPTCL");
        assert_eq!(network.status(), Status::Closed);
    }

    #[tokio::test]
    async fn test_nak_restarts_login() {
        let master = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut network = HomebrewNetwork::new(config(master.local_addr().unwrap().port()));
        network.set_options("TS2=214");
        network.open().await.unwrap();
        let (_, peer) = recv(&master).await;

        master.send_to(b"RPTACK\x00\x00\x00\x01", peer).await.unwrap();
        pump(&mut network, |n| n.status() == Status::WaitingAuthorisation).await;
        master.send_to(b"RPTACK", peer).await.unwrap();
        pump(&mut network, |n| n.status() == Status::WaitingConfig).await;
        master.send_to(b"RPTACK", peer).await.unwrap();
        pump(&mut network, |n| n.status() == Status::WaitingOptions).await;

        master.send_to(b"MSTNAK\x0C\xC1\x61\xE5", peer).await.unwrap();
        pump(&mut network, |n| n.status() == Status::WaitingLogin).await;

        // The login is resent once the retry period passes.
        network.clock(RETRY_PERIOD).await;
        let mut last = Vec::new();
        for _ in 0..4 {
            last = recv(&master).await.0;
            if last.starts_with(b"RPTL") {
                break;
            }
        }
        assert!(last.starts_with(b"RPTL"));
    }

    #[test]
    fn test_reset_drops_slot_traffic() {
        let mut network = HomebrewNetwork::new(config(62031));
        let lc = LinkControl::new(CallType::Group, DmrId::new(1), DmrId::new(2));
        let data = DmrData::new(
            Slot::Two,
            lc.src,
            lc.dst,
            lc.call_type,
            DataType::TerminatorWithLc,
            Burst::encode_terminator(&lc, 1),
        );
        network.received.push_back(data);
        let before = network.stream_ids[1];
        network.reset(Slot::Two);
        assert!(network.read().is_none());
        assert_ne!(network.stream_ids[1], before);
    }
}

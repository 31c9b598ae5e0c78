//! Configuration management for ysf2dmr.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::{queue_capacity, RoutingPolicy, SourceIdPolicy};
use crate::error::{Error, Result};
use crate::network::{HomebrewConfig, RepeaterInfo, YsfLinkConfig};
use crate::types::{CallType, Callsign, DmrId, Slot};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Station identity and the repeater link.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Station details reported to the DMR master.
    #[serde(default)]
    pub info: InfoConfig,

    /// DMR master link and call routing.
    #[serde(default)]
    pub dmr_network: DmrNetworkConfig,

    /// DMR ID database.
    #[serde(default)]
    pub id_lookup: IdLookupConfig,

    /// Scheduler cadence.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        config.general.callsign = config.general.callsign.trim().to_ascii_uppercase();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.general.callsign.is_empty() {
            return Err(Error::InvalidConfig("general.callsign is required".into()));
        }

        let dmr = &self.dmr_network;
        if dmr.id == 0 {
            return Err(Error::InvalidConfig("dmr_network.id is required".into()));
        }
        if DmrId::try_from(dmr.id).is_err() && DmrId::try_from(dmr.id / 100).is_err() {
            return Err(Error::InvalidConfig(format!(
                "dmr_network.id {} is neither a radio ID nor a radio ID with a two digit suffix",
                dmr.id
            )));
        }
        if dmr.dst_id == DmrId::default() {
            return Err(Error::InvalidConfig("dmr_network.dst_id is required".into()));
        }
        if dmr.color_code > 15 {
            return Err(Error::InvalidConfig(format!(
                "dmr_network.color_code {} is out of range 0-15",
                dmr.color_code
            )));
        }
        if dmr.address.is_empty() {
            return Err(Error::InvalidConfig("dmr_network.address is required".into()));
        }
        let slot_enabled = match dmr.slot {
            Slot::One => dmr.slot1,
            Slot::Two => dmr.slot2,
        };
        if !slot_enabled {
            return Err(Error::InvalidConfig(format!(
                "dmr_network.slot {} is disabled",
                dmr.slot.number()
            )));
        }

        let timing = &self.timing;
        for (name, value) in [
            ("dmr_interval", timing.dmr_interval),
            ("ysf_interval", timing.ysf_interval),
            ("watchdog", timing.watchdog),
            ("poll_interval", timing.poll_interval),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidConfig(format!("timing.{name} must be non-zero")));
            }
        }

        if !matches!(self.log.format.as_str(), "text" | "json") {
            return Err(Error::InvalidConfig(format!(
                "log.format must be text or json, not {}",
                self.log.format
            )));
        }

        Ok(())
    }

    /// Create example configuration.
    pub fn example() -> Self {
        Self {
            general: GeneralConfig {
                callsign: "EA7EE".into(),
                daemon: true,
                pid_file: Some(PathBuf::from("/run/ysf2dmr.pid")),
                ..Default::default()
            },
            info: InfoConfig {
                rx_frequency: 430_450_000,
                tx_frequency: 439_450_000,
                power: 1,
                latitude: 37.25,
                longitude: -6.95,
                height: 12,
                location: "Huelva".into(),
                description: "YSF2DMR gateway".into(),
                url: "https://www.qrz.com/db/EA7EE".into(),
            },
            dmr_network: DmrNetworkConfig {
                id: 214_000_101,
                address: "master.example.org".into(),
                password: "passw0rd".into(),
                dst_id: DmrId::new(214),
                ..Default::default()
            },
            id_lookup: IdLookupConfig {
                file: Some(PathBuf::from("/usr/local/etc/DMRIds.dat")),
                ..Default::default()
            },
            log: LogConfig {
                file_path: Some(PathBuf::from("/var/log/ysf2dmr")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Call routing derived from the DMR network section.
    pub fn routing_policy(&self) -> RoutingPolicy {
        let dmr = &self.dmr_network;
        RoutingPolicy {
            gateway_id: dmr.radio_id(),
            gateway_callsign: Callsign::new(&self.general.callsign),
            source_id: dmr.source_id,
            dst_id: dmr.dst_id,
            call_type: dmr.call_type,
            slot: dmr.slot,
            color_code: dmr.color_code,
        }
    }

    /// Voice slices each direction may hold.
    pub fn queue_capacity(&self) -> usize {
        queue_capacity(self.dmr_network.jitter)
    }

    pub fn homebrew(&self) -> HomebrewConfig {
        let dmr = &self.dmr_network;
        HomebrewConfig {
            address: dmr.address.clone(),
            port: dmr.port,
            local_port: dmr.local,
            id: dmr.id,
            password: dmr.password.clone(),
            slot1: dmr.slot1,
            slot2: dmr.slot2,
            debug: dmr.debug,
        }
    }

    pub fn ysf_link(&self) -> YsfLinkConfig {
        let general = &self.general;
        YsfLinkConfig {
            callsign: general.callsign.clone(),
            address: general.repeater_address.clone(),
            port: general.repeater_port,
            local_address: general.local_address.clone(),
            local_port: general.local_port,
            debug: self.dmr_network.debug,
        }
    }

    pub fn repeater_info(&self) -> RepeaterInfo {
        let info = &self.info;
        RepeaterInfo {
            callsign: self.general.callsign.clone(),
            rx_frequency: info.rx_frequency,
            tx_frequency: info.tx_frequency,
            power: info.power,
            color_code: self.dmr_network.color_code,
            latitude: info.latitude,
            longitude: info.longitude,
            height: info.height,
            location: info.location.clone(),
            description: info.description.clone(),
            url: info.url.clone(),
        }
    }
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Gateway callsign, sent in YSF polls and frames.
    #[serde(default)]
    pub callsign: String,

    /// YSF repeater (or MMDVMHost) address.
    #[serde(default = "default_repeater_address")]
    pub repeater_address: String,

    #[serde(default = "default_repeater_port")]
    pub repeater_port: u16,

    /// Local address of the YSF link; empty binds the wildcard address.
    #[serde(default = "default_local_address")]
    pub local_address: String,

    #[serde(default = "default_local_port")]
    pub local_port: u16,

    /// Detach from the terminal on start.
    #[serde(default)]
    pub daemon: bool,

    /// User to switch to when started as root in daemon mode.
    #[serde(default = "default_user")]
    pub user: String,

    /// PID file written in daemon mode.
    pub pid_file: Option<PathBuf>,
}

fn default_repeater_address() -> String {
    "127.0.0.1".into()
}
fn default_repeater_port() -> u16 {
    3200
}
fn default_local_address() -> String {
    "127.0.0.1".into()
}
fn default_local_port() -> u16 {
    42013
}
fn default_user() -> String {
    "mmdvm".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            callsign: String::new(),
            repeater_address: default_repeater_address(),
            repeater_port: default_repeater_port(),
            local_address: default_local_address(),
            local_port: default_local_port(),
            daemon: false,
            user: default_user(),
            pid_file: None,
        }
    }
}

/// Station details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    /// Receive frequency in Hz.
    pub rx_frequency: u32,
    /// Transmit frequency in Hz.
    pub tx_frequency: u32,
    /// Power in watts.
    pub power: u32,
    pub latitude: f32,
    pub longitude: f32,
    /// Antenna height in metres.
    pub height: i32,
    pub location: String,
    pub description: String,
    pub url: String,
}

/// DMR network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmrNetworkConfig {
    /// Repeater ID logged into the master.
    #[serde(default)]
    pub id: u32,

    #[serde(default = "default_color_code")]
    pub color_code: u8,

    /// Master address.
    #[serde(default)]
    pub address: String,

    #[serde(default = "default_dmr_port")]
    pub port: u16,

    /// Local UDP port (0 = ephemeral).
    #[serde(default)]
    pub local: u16,

    #[serde(default)]
    pub password: String,

    /// Options string sent with `RPTO`; empty sends none.
    #[serde(default)]
    pub options: String,

    /// Hex dump network packets at trace level.
    #[serde(default)]
    pub debug: bool,

    /// Arrival jitter to absorb.
    #[serde(default = "default_jitter", with = "humantime_serde")]
    pub jitter: Duration,

    #[serde(default = "default_slot_enabled")]
    pub slot1: bool,

    #[serde(default = "default_slot_enabled")]
    pub slot2: bool,

    /// Talkgroup (or radio) that YSF calls go to.
    #[serde(default)]
    pub dst_id: DmrId,

    #[serde(default)]
    pub call_type: CallType,

    /// Where the DMR source ID of YSF calls comes from.
    #[serde(default)]
    pub source_id: SourceIdPolicy,

    /// Timeslot bridged to YSF.
    #[serde(default)]
    pub slot: Slot,
}

impl DmrNetworkConfig {
    /// Radio ID of the gateway, the fallback source of YSF calls.
    ///
    /// Nine digit repeater IDs are a seven digit radio ID plus a two digit suffix.
    pub fn radio_id(&self) -> DmrId {
        DmrId::try_from(self.id).unwrap_or_else(|_| DmrId::new(self.id / 100))
    }
}

fn default_color_code() -> u8 {
    2
}
fn default_dmr_port() -> u16 {
    62031
}
fn default_jitter() -> Duration {
    Duration::from_millis(300)
}
fn default_slot_enabled() -> bool {
    true
}

impl Default for DmrNetworkConfig {
    fn default() -> Self {
        Self {
            id: 0,
            color_code: default_color_code(),
            address: String::new(),
            port: default_dmr_port(),
            local: 0,
            password: String::new(),
            options: String::new(),
            debug: false,
            jitter: default_jitter(),
            slot1: default_slot_enabled(),
            slot2: default_slot_enabled(),
            dst_id: DmrId::default(),
            call_type: CallType::default(),
            source_id: SourceIdPolicy::default(),
            slot: Slot::default(),
        }
    }
}

/// DMR ID database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdLookupConfig {
    /// `DMRIds.dat` file; without one every lookup falls back.
    pub file: Option<PathBuf>,

    /// How often the file is re-read.
    #[serde(default = "default_reload", with = "humantime_serde")]
    pub reload: Duration,
}

fn default_reload() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

impl Default for IdLookupConfig {
    fn default() -> Self {
        Self {
            file: None,
            reload: default_reload(),
        }
    }
}

/// Scheduler cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Minimum gap between DMR bursts sent.
    #[serde(default = "default_dmr_interval", with = "humantime_serde")]
    pub dmr_interval: Duration,

    /// Minimum gap between YSF frames sent.
    #[serde(default = "default_ysf_interval", with = "humantime_serde")]
    pub ysf_interval: Duration,

    /// Silence after which a call is considered stalled.
    #[serde(default = "default_watchdog", with = "humantime_serde")]
    pub watchdog: Duration,

    /// YSF keepalive poll period.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Shortest loop iteration.
    #[serde(default = "default_tick_floor", with = "humantime_serde")]
    pub tick_floor: Duration,
}

fn default_dmr_interval() -> Duration {
    Duration::from_millis(55)
}
fn default_ysf_interval() -> Duration {
    Duration::from_millis(90)
}
fn default_watchdog() -> Duration {
    Duration::from_millis(1500)
}
fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_tick_floor() -> Duration {
    Duration::from_millis(5)
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dmr_interval: default_dmr_interval(),
            ysf_interval: default_ysf_interval(),
            watchdog: default_watchdog(),
            poll_interval: default_poll_interval(),
            tick_floor: default_tick_floor(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text or json).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable colored output.
    #[serde(default = "default_color")]
    pub color: bool,

    /// Directory for the log file; logs go to stderr when unset.
    pub file_path: Option<PathBuf>,

    /// Log file name without extension.
    #[serde(default = "default_file_root")]
    pub file_root: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_color() -> bool {
    true
}
fn default_file_root() -> String {
    "ysf2dmr".into()
}

impl LogConfig {
    /// Full path of the log file, if logging to a file.
    pub fn file(&self) -> Option<PathBuf> {
        self.file_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.log", self.file_root)))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_color(),
            file_path: None,
            file_root: default_file_root(),
        }
    }
}

/// Initialize logging.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    use std::sync::Arc;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file = match config.file() {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::Config(format!("Failed to open {}: {e}", path.display())))?;
            Some(Arc::new(file))
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match (config.format.as_str(), file) {
        ("json", Some(file)) => subscriber.with(fmt::layer().json().with_writer(file)).try_init(),
        ("json", None) => subscriber.with(fmt::layer().json()).try_init(),
        (_, Some(file)) => subscriber
            .with(fmt::layer().with_ansi(false).with_writer(file))
            .try_init(),
        (_, None) => subscriber.with(fmt::layer().with_ansi(config.color)).try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to init logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[general]
callsign = "ea7ee"

[dmr_network]
id = 214000101
address = "master.example.org"
password = "secret"
dst_id = 91
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.general.callsign, "EA7EE");
        assert_eq!(config.general.repeater_port, 3200);
        assert_eq!(config.dmr_network.color_code, 2);
        assert_eq!(config.dmr_network.jitter, Duration::from_millis(300));
        assert_eq!(config.dmr_network.slot, Slot::Two);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.id_lookup.reload, Duration::from_secs(86_400));
        assert_eq!(config.queue_capacity(), 120);

        let policy = config.routing_policy();
        assert_eq!(policy.gateway_id, DmrId::new(2_140_001));
        assert_eq!(config.homebrew().id, 214_000_101);
        assert_eq!(policy.dst_id, DmrId::new(91));
        assert_eq!(policy.call_type, CallType::Group);
        assert_eq!(policy.gateway_callsign, Callsign::new("EA7EE"));
    }

    #[test]
    fn test_humantime_and_enums() {
        let text = format!(
            "{MINIMAL}call_type = \"private\"\nsource_id = \"fixed\"\nslot = 1\njitter = \"500ms\"\n\n[timing]\nwatchdog = \"2s\"\n"
        );
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.dmr_network.call_type, CallType::Private);
        assert_eq!(config.dmr_network.source_id, SourceIdPolicy::Fixed);
        assert_eq!(config.dmr_network.slot, Slot::One);
        assert_eq!(config.timing.watchdog, Duration::from_secs(2));
        assert_eq!(config.timing.dmr_interval, Duration::from_millis(55));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::parse("[general]\ncallsign = \"EA7EE\"\n"),
            Err(Error::InvalidConfig(_))
        ));

        let mut config = Config::example();
        config.validate().unwrap();

        config.dmr_network.color_code = 16;
        assert!(config.validate().is_err());

        config.dmr_network.color_code = 1;
        config.dmr_network.id = 4_000_000_000;
        assert!(config.validate().is_err());
        config.dmr_network.id = 2_140_001;
        config.validate().unwrap();
        assert_eq!(config.routing_policy().gateway_id, DmrId::new(2_140_001));

        config.dmr_network.color_code = 1;
        config.dmr_network.slot2 = false;
        assert!(config.validate().is_err());

        config.dmr_network.slot2 = true;
        config.log.format = "xml".into();
        assert!(config.validate().is_err());

        assert!(matches!(Config::parse("not toml ["), Err(Error::Config(_))));
        assert!(matches!(
            Config::parse(&format!("{MINIMAL}slot = 3\n")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_example_round_trip() {
        let example = Config::example();
        let text = toml::to_string_pretty(&example).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.dmr_network.dst_id, example.dmr_network.dst_id);
        assert_eq!(parsed.info, example.info);
        assert_eq!(parsed.log.file(), Some(PathBuf::from("/var/log/ysf2dmr/ysf2dmr.log")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.homebrew().port, 62031);
        assert_eq!(config.ysf_link().callsign, "EA7EE");
        assert_eq!(config.repeater_info().color_code, 2);

        assert!(matches!(
            Config::load("/nonexistent/ysf2dmr.toml"),
            Err(Error::Config(_))
        ));
    }
}

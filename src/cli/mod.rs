//! Command line interface for ysf2dmr.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// ysf2dmr - Yaesu System Fusion to DMR gateway
#[derive(Parser, Debug)]
#[command(
    name = "ysf2dmr",
    author,
    version,
    about = "Bridges a YSF repeater to a DMR Homebrew master",
    long_about = r#"
ysf2dmr relays voice calls between a Yaesu System Fusion repeater (or
MMDVMHost in YSF mode) and a DMR network master using the Homebrew protocol.

YSF calls go out on the configured DMR talkgroup; DMR calls on that talkgroup
and timeslot come back to the repeater with callsigns resolved from DMRIds.dat.

QUICK START:
  ysf2dmr --print-config > /etc/ysf2dmr.toml
  ysf2dmr /etc/ysf2dmr.toml --foreground
"#
)]
pub struct Cli {
    /// Configuration file path
    #[arg(default_value = "/etc/ysf2dmr.toml")]
    pub config: PathBuf,

    /// Stay in the foreground even if the configuration asks for daemon mode
    #[arg(short, long)]
    pub foreground: bool,

    /// Log level (trace, debug, info, warn, error); overrides the configuration
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log format; overrides the configuration
    #[arg(long)]
    pub format: Option<LogFormat>,

    /// Print an example configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

//! # ysf2dmr
//!
//! Gateway between Yaesu System Fusion (YSF) repeaters and DMR networks.
//!
//! Voice is relayed without transcoding: both modes carry the same 72-bit
//! AMBE+2 vocoder slices, three per DMR burst and five per YSF V/D mode 2
//! frame. The gateway regroups those slices, rebuilds the signalling of the
//! target mode and paces the result to the target's frame rate.
//!
//! ## Architecture
//!
//! ┌──────────────┐  YSFD/YSFP  ┌───────────────────────┐  DMRD  ┌────────────┐
//! │ YSF repeater │ ◄─────────► │ Gateway tick loop     │ ◄────► │ DMR master │
//! └──────────────┘             │  ysf ◄─ Bridge ─► dmr │        └────────────┘
//!                              │  pacing, watchdogs    │
//!                              └───────────────────────┘

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]              // ASCII diagrams in docs
#![allow(clippy::unreadable_literal)]        // Codewords and masks read better unbroken
#![allow(clippy::cast_possible_truncation)]  // Bit packing
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]             // src/dst, fi/fn
#![allow(clippy::struct_excessive_bools)]    // Boolean config fields are appropriate
#![allow(clippy::match_same_arms)]           // Explicit arm per variant is clearer
#![allow(clippy::return_self_not_must_use)]  // Builder methods don't need must_use
#![allow(clippy::ignored_unit_patterns)]

pub mod bridge;
pub mod config;
pub mod daemon;
pub mod dmr;
pub mod error;
pub mod fec;
pub mod gateway;
pub mod lookup;
pub mod network;
pub mod signals;
pub mod types;
pub mod ysf;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{Bridge, RoutingPolicy, SourceIdPolicy};
    pub use crate::config::Config;
    pub use crate::dmr::{Burst, DataType, DmrData, LinkControl, VoiceSlice};
    pub use crate::error::{Error, ProtocolError, Result};
    pub use crate::gateway::Gateway;
    pub use crate::lookup::{CallsignLookup, IdLookup};
    pub use crate::network::{DmrNetwork, HomebrewNetwork, YsfLink, YsfNetwork};
    pub use crate::types::*;
    pub use crate::ysf::{FrameAddress, YsfFrame};
}

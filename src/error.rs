//! Error types for the gateway.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    // Frame codec errors
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // Transport errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Frame decoding and encoding errors.
///
/// None of these are fatal to the gateway: the offending frame is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid frame length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("unknown frame tag")]
    UnknownTag,

    #[error("FICH failed validation")]
    InvalidFich,

    #[error("full link control failed validation")]
    InvalidFullLc,

    #[error("EMB failed validation")]
    InvalidEmb,

    #[error("slot type failed validation")]
    InvalidSlotType,

    #[error("unrecognized data type: {0:#04x}")]
    UnrecognizedDataType(u8),

    #[error("data channel failed validation")]
    InvalidDataChannel,

    #[error("header payload failed validation")]
    InvalidHeaderPayload,
}

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind failed on {addr}: {reason}")]
    BindFailed { addr: SocketAddr, reason: String },

    #[error("cannot resolve {0}")]
    ResolveFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("transport is not open")]
    NotOpen,
}

impl Error {
    /// Check if the error only affects a single frame (drop it and continue).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::Transport(TransportError::SendFailed(_))
        )
    }
}

//! Unified error types for the RelayNode firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! main loop's error handling uniform.  Variants are `Copy` so they can be
//! passed through the sync engine and the outbox without allocation.
//!
//! Each peer-visible failure maps to a stable wire tag via
//! [`Error::wire_tag`]; the server matches on these strings.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A register transaction on the output bus failed.
    Bus(BusError),
    /// A relay request could not be carried out.
    Sync(SyncError),
    /// An inbound message could not be decoded.
    Codec(CodecError),
    /// A configuration value was rejected.
    Config(&'static str),
    /// The server link is not usable.
    Link(&'static str),
}

impl Error {
    /// The `error_type` string reported to the server.
    pub const fn wire_tag(&self) -> &'static str {
        match self {
            Self::Bus(_) => "I2C_ERROR",
            Self::Sync(e) => e.wire_tag(),
            Self::Codec(e) => e.wire_tag(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Link(_) => "LINK_ERROR",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sync(e) => write!(f, "sync: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Link(msg) => write!(f, "link: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Failure of a single register transaction.  Never retried by the bus
/// driver itself; retry policy belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The device did not acknowledge its address or a data byte.
    Nack,
    /// A read completed without returning data.
    NoData,
    /// Arbitration loss, bus fault, or a pin driver error.
    Other,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "no acknowledge"),
            Self::NoData => write!(f, "no data available"),
            Self::Other => write!(f, "bus fault"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The request named a channel outside `0..8`.
    InvalidChannel(i64),
    /// The output register write or read-back failed.
    BusCommunicationFailure(BusError),
}

impl SyncError {
    pub const fn wire_tag(&self) -> &'static str {
        match self {
            Self::InvalidChannel(_) => "INVALID_RELAY",
            Self::BusCommunicationFailure(_) => "I2C_ERROR",
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "invalid relay channel {ch} (expected 0-7)"),
            Self::BusCommunicationFailure(e) => write!(f, "I2C communication failed: {e}"),
        }
    }
}

impl From<SyncError> for Error {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<BusError> for SyncError {
    fn from(e: BusError) -> Self {
        Self::BusCommunicationFailure(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Syntax error, missing `type`, or a required field absent/mistyped.
    MalformedMessage,
    /// Well-formed message whose `type` is not recognised.
    UnknownMessageType,
    /// Payload exceeds the inbound size bound; rejected, not truncated.
    MessageTooLarge(usize),
    /// Outbound serialisation failed.
    EncodeFailed,
}

impl CodecError {
    pub const fn wire_tag(&self) -> &'static str {
        match self {
            Self::MalformedMessage => "JSON_PARSE_ERROR",
            Self::UnknownMessageType => "UNKNOWN_MESSAGE_TYPE",
            Self::MessageTooLarge(_) => "MESSAGE_TOO_LARGE",
            Self::EncodeFailed => "ENCODE_ERROR",
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedMessage => write!(f, "malformed message"),
            Self::UnknownMessageType => write!(f, "unknown message type"),
            Self::MessageTooLarge(len) => write!(f, "message too large ({len} bytes)"),
            Self::EncodeFailed => write!(f, "encode failed"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

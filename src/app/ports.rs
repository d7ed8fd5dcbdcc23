//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (register bus, input lines, server link, event sinks,
//! config storage, console) implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! or sockets directly.

use crate::config::DeviceConfig;
use crate::error::BusError;

// ───────────────────────────────────────────────────────────────
// Register bus (driven adapter: domain → relay output hardware)
// ───────────────────────────────────────────────────────────────

/// Byte-wide register access on the relay output device.
///
/// Each call is exactly one bounded bus transaction.  Implementations
/// never retry; a failed transaction is surfaced as [`BusError`] and the
/// caller decides what to do.
pub trait RegisterBus {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusError>;

    fn read_register(&mut self, reg: u8) -> Result<u8, BusError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        (**self).write_register(reg, value)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, BusError> {
        (**self).read_register(reg)
    }
}

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: input lines → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the 8 digital inputs.
pub trait InputPort {
    /// Sample every line and return the logical mask (bit set = active).
    /// Polarity inversion is the adapter's job.  `previous` is the last
    /// known mask; lines that fail to read keep their previous bit.
    fn sample(&mut self, previous: u8) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Server link (driven adapter: domain ↔ message channel)
// ───────────────────────────────────────────────────────────────

/// Notifications delivered by the link, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The channel to the server is open.
    Connected,
    /// The channel dropped (or a connect attempt failed asynchronously).
    Disconnected,
    /// One complete inbound text message.
    Text(String),
}

/// A message-oriented channel to exactly one remote peer.
pub trait Link {
    /// Start opening the channel to `uri`.  May complete asynchronously,
    /// in which case [`LinkEvent::Connected`] arrives later.
    fn connect(&mut self, uri: &str) -> Result<(), LinkError>;

    /// Close the channel.  No event is required in response.
    fn disconnect(&mut self);

    /// Deliver one text message to the peer.
    fn send(&mut self, text: &str) -> Result<(), LinkError>;

    /// Next pending notification, if any.  Never blocks.
    fn poll_event(&mut self) -> Option<LinkEvent>;
}

/// Errors from [`Link`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The channel is not open.
    NotConnected,
    /// Opening the channel failed immediately.
    ConnectFailed,
    /// The message could not be handed to the transport.
    SendFailed,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::SendFailed => write!(f, "send failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Network identity
// ───────────────────────────────────────────────────────────────

/// Addresses reported in `register` and `state` messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Colon-separated uppercase MAC, e.g. `94:A9:90:23:06:80`.
    pub mac: String,
    /// Dotted IPv4 address, or `0.0.0.0` before DHCP completes.
    pub ip: String,
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the device configuration record.
///
/// Implementations MUST validate before persisting.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`DeviceConfig::default()`] if no stored record exists and
    /// [`ConfigError::Corrupted`] if the record fails its guard checks.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Console port (driven adapter: serial provisioning → domain)
// ───────────────────────────────────────────────────────────────

/// Line-oriented provisioning console.
pub trait ConsolePort {
    /// Next complete input line (without the terminator), if any.
    fn poll_line(&mut self) -> Option<String>;

    /// Print one line back to the operator.
    fn write_line(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored record failed its magic/version check or did not decode.
    Corrupted,
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("config not found"),
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("storage I/O error"),
        }
    }
}

impl From<LinkError> for crate::error::Error {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::NotConnected => Self::Link("not connected"),
            LinkError::ConnectFailed => Self::Link("connect failed"),
            LinkError::SendFailed => Self::Link("send failed"),
        }
    }
}

//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port for local observability.
//! They never reach the server; peer-visible messages are
//! [`OutboundMessage`](crate::protocol::messages::OutboundMessage)s.

use crate::config::ConfigChange;
use crate::error::{CodecError, SyncError};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service drove the outputs to their boot state.
    Started { relays: u8, outputs_ok: bool },

    /// A relay request was written and committed.
    RelayApplied { channel: u8, on: bool, mask: u8 },

    /// A relay request was refused or the write failed.
    RelayFailed { relay: i64, on: bool, error: SyncError },

    /// The output read-back disagreed with what was written.
    VerifyMismatch { written: u8, readback: u8 },

    /// At least one input line changed level.
    InputsChanged { mask: u8 },

    /// The server link came up; `register` and `state` were queued.
    LinkUp,

    /// The server link went down.
    LinkDown,

    /// An inbound message was dropped.
    MessageRejected(CodecError),

    /// A configuration patch was applied and persisted.
    ConfigUpdated(ConfigChange),

    /// A configuration patch was refused.
    ConfigRejected(&'static str),
}

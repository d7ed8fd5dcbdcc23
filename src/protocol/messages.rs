//! Wire message types exchanged with the server.
//!
//! Every message is one JSON object whose `type` field names the variant.
//! Inbound commands are decoded by [`super::codec`]; outbound messages are
//! built by the service and serialised with [`super::codec::encode`].

use serde::{Deserialize, Serialize};

use crate::relay::bank::RELAY_COUNT;

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// A decoded, well-formed command from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Drive one relay.  `relay` is carried raw; range checking is the
    /// sync engine's job so that the ack can echo what was asked for.
    RelayControl { relay: i64, state: bool },
    /// Partial configuration update, still as raw JSON.  Field types are
    /// checked by [`crate::config::ConfigPatch::from_json`] so that a bad
    /// value is answered with a `config_response`.
    Config(serde_json::Value),
    /// Liveness check; answered with [`OutboundMessage::Pong`].
    Ping,
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

/// Everything the device sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once per (re)connection, before the first `state`.
    Register {
        device_id: String,
        device_name: String,
        mac: String,
        ip: String,
    },
    /// Full snapshot of inputs and relays.
    State {
        device_id: String,
        mac: String,
        ip: String,
        inputs: [bool; RELAY_COUNT],
        relays: [bool; RELAY_COUNT],
    },
    RelayControlAck {
        relay: i64,
        state: bool,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Post-write verification.  Both states come from the in-memory
    /// masks, not from the register read-back.
    RelayStateVerified {
        relay: u8,
        exio_pin: u8,
        expected_state: bool,
        actual_state: bool,
    },
    ErrorReport {
        error_type: String,
        message: String,
    },
    ConfigResponse {
        success: bool,
        message: String,
    },
    Pong {
        device_id: String,
        uptime_ms: u64,
    },
}

impl OutboundMessage {
    pub fn error_report(error_type: &str, message: impl Into<String>) -> Self {
        Self::ErrorReport {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// The `type` tag, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::State { .. } => "state",
            Self::RelayControlAck { .. } => "relay_control_ack",
            Self::RelayStateVerified { .. } => "relay_state_verified",
            Self::ErrorReport { .. } => "error_report",
            Self::ConfigResponse { .. } => "config_response",
            Self::Pong { .. } => "pong",
        }
    }
}

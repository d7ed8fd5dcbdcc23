//! JSON text ⇄ typed messages.
//!
//! Decoding is two-stage: the `type` field is read from a minimal envelope
//! first, then the body is parsed into the shape that type requires.  A
//! payload larger than [`MAX_INBOUND_LEN`] is rejected before any parsing.
//! Nothing in this module panics on bad input.

use log::warn;
use serde::Deserialize;
use serde_json::{Number, Value};

use super::messages::{InboundCommand, OutboundMessage};
use crate::error::CodecError;

/// Largest inbound text accepted, in bytes.
pub const MAX_INBOUND_LEN: usize = 512;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct RelayControlBody {
    relay: RelayIndex,
    state: bool,
}

/// Stand-in index for numbers that cannot name a channel.  Any value
/// outside `0..8` is rejected by the sync engine with `INVALID_RELAY`.
const NO_CHANNEL: i64 = -1;

/// The server has forwarded `relay` both as a number and as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RelayIndex {
    Number(Number),
    Text(String),
}

impl RelayIndex {
    fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(number_index(n)),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Integers keep their value, saturating above `i64::MAX`.  Fractional
/// notation (`3.0`, `2.5`) is never a channel.
fn number_index(n: &Number) -> i64 {
    if let Some(v) = n.as_i64() {
        v
    } else if n.is_u64() {
        i64::MAX
    } else {
        NO_CHANNEL
    }
}

#[derive(Deserialize)]
struct ConfigBody {
    data: Value,
}

/// Decode one inbound text message.
pub fn decode(text: &str) -> Result<InboundCommand, CodecError> {
    if text.len() > MAX_INBOUND_LEN {
        return Err(CodecError::MessageTooLarge(text.len()));
    }

    let envelope: Envelope =
        serde_json::from_str(text).map_err(|_| CodecError::MalformedMessage)?;

    match envelope.kind.as_str() {
        "relay_control" => {
            let body: RelayControlBody =
                serde_json::from_str(text).map_err(|_| CodecError::MalformedMessage)?;
            let relay = body.relay.value().ok_or(CodecError::MalformedMessage)?;
            Ok(InboundCommand::RelayControl {
                relay,
                state: body.state,
            })
        }
        "config" => {
            let body: ConfigBody =
                serde_json::from_str(text).map_err(|_| CodecError::MalformedMessage)?;
            Ok(InboundCommand::Config(body.data))
        }
        "ping" => Ok(InboundCommand::Ping),
        other => {
            warn!("Codec: unknown message type '{}'", other);
            Err(CodecError::UnknownMessageType)
        }
    }
}

/// Encode one outbound message as compact JSON.
pub fn encode(msg: &OutboundMessage) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(|_| CodecError::EncodeFailed)
}

//! Server protocol: JSON message types, the codec, and a null link.

pub mod codec;
pub mod messages;
pub mod transport;

pub use codec::{MAX_INBOUND_LEN, decode, encode};
pub use messages::{InboundCommand, OutboundMessage};

//! Inbound commands to the application service.
//!
//! Server commands arrive as [`InboundCommand`]s decoded by the protocol
//! codec.  Operator input on the serial console is parsed here into a
//! [`ConsoleCommand`]; a JSON line carries the same patch shape as a
//! server `config` message.

use serde_json::Value;

pub use crate::protocol::messages::InboundCommand;

/// One line typed on the provisioning console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print the active configuration (password masked).
    Show,
    /// Apply a partial configuration update (a JSON object, field types
    /// not yet checked).
    Patch(Value),
    /// Nothing typed.
    Empty,
    /// Not a recognised command or not valid JSON.
    Invalid,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if line.eq_ignore_ascii_case("show") {
            return Self::Show;
        }
        if line.starts_with('{') {
            return match serde_json::from_str::<Value>(line) {
                Ok(data) => Self::Patch(data),
                Err(_) => Self::Invalid,
            };
        }
        Self::Invalid
    }
}

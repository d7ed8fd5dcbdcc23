//! Relay synchronisation: stage → apply → verify → acknowledge.
//!
//! The engine owns the [`RelayBank`] and is the only code that moves its
//! masks.  Every request runs to completion inside one call:
//!
//! 1. reject channels outside `0..8` without touching the bus;
//! 2. stage the new bit in `expected` and `current`;
//! 3. write `current` to the output register, rolling back on failure;
//! 4. read the register back and compare (advisory only);
//! 5. build the ack.
//!
//! Broadcasting the new snapshot and rate-limiting error reports need
//! connection and timing state, so the service does that from the
//! returned [`SyncOutcome`].

use log::{debug, error, info, warn};

use super::bank::{Channel, RelayBank};
use crate::app::ports::RegisterBus;
use crate::error::{BusError, SyncError};
use crate::pins::EXPANDER_REG_OUTPUT;
use crate::protocol::messages::OutboundMessage;

/// Error type reported when the read-back differs from what was written.
pub const VERIFY_MISMATCH_TAG: &str = "I2C_VERIFY_MISMATCH";

/// Something the peer should hear about besides the ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReport {
    /// The request itself was invalid.
    Rejected(SyncError),
    /// The output write failed and the masks were rolled back.
    WriteFailed(SyncError),
    /// The write succeeded but the read-back transaction failed.
    ReadbackFailed(BusError),
    /// The read-back returned a different byte than was written.
    VerifyMismatch { written: u8, readback: u8 },
}

impl SyncReport {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Rejected(e) | Self::WriteFailed(e) => e.wire_tag(),
            Self::ReadbackFailed(_) => "I2C_ERROR",
            Self::VerifyMismatch { .. } => VERIFY_MISMATCH_TAG,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Rejected(e) | Self::WriteFailed(e) => e.to_string(),
            Self::ReadbackFailed(e) => format!("output read-back failed: {e}"),
            Self::VerifyMismatch { written, readback } => {
                format!("output register mismatch: wrote 0x{written:02X}, read 0x{readback:02X}")
            }
        }
    }

    /// Bus-health reports are throttled; request errors are not.
    pub const fn is_rate_limited(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Result of one relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// `Ok` with the channel if the output write was accepted.
    pub result: Result<Channel, SyncError>,
    /// Raw read-back, when one was attempted.
    pub readback: Option<Result<u8, BusError>>,
    /// Messages for the peer, in send order.
    pub messages: Vec<OutboundMessage>,
    pub report: Option<SyncReport>,
}

impl SyncOutcome {
    pub fn applied(&self) -> bool {
        self.result.is_ok()
    }
}

/// Owns the relay masks and drives them onto a [`RegisterBus`].
#[derive(Debug, Clone)]
pub struct SyncEngine {
    bank: RelayBank,
    output_reg: u8,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngine {
    /// All relays off, writing to the expander output register.
    pub const fn new() -> Self {
        Self::with_output_register(EXPANDER_REG_OUTPUT)
    }

    pub const fn with_output_register(output_reg: u8) -> Self {
        Self {
            bank: RelayBank::new(),
            output_reg,
        }
    }

    pub const fn bank(&self) -> &RelayBank {
        &self.bank
    }

    /// Drive the in-memory `current` mask onto the outputs.
    ///
    /// Called once at boot so the hardware matches the all-off bank.
    pub fn sync_outputs<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), SyncError> {
        let mask = self.bank.current();
        match bus.write_register(self.output_reg, mask) {
            Ok(()) => {
                self.bank.commit();
                debug!("Sync: outputs driven to 0x{:02X}", mask);
                Ok(())
            }
            Err(e) => {
                self.bank.rollback();
                error!("Sync: initial output write failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Run one relay request to completion.
    pub fn apply<B: RegisterBus>(&mut self, bus: &mut B, relay: i64, on: bool) -> SyncOutcome {
        let Some(ch) = Channel::new(relay) else {
            let err = SyncError::InvalidChannel(relay);
            warn!("Sync: rejected request for relay {}", relay);
            return SyncOutcome {
                result: Err(err),
                readback: None,
                messages: vec![ack(relay, on, Err(err))],
                report: Some(SyncReport::Rejected(err)),
            };
        };

        let staged = self.bank.stage(ch, on);

        if let Err(e) = bus.write_register(self.output_reg, staged) {
            self.bank.rollback();
            let err = SyncError::from(e);
            error!(
                "Sync: relay {} write 0x{:02X} failed ({}), rolled back to 0x{:02X}",
                ch.index(),
                staged,
                e,
                self.bank.current()
            );
            return SyncOutcome {
                result: Err(err),
                readback: None,
                messages: vec![ack(relay, on, Err(err))],
                report: Some(SyncReport::WriteFailed(err)),
            };
        }
        self.bank.commit();
        info!(
            "Sync: relay {} -> {} (mask 0x{:02X})",
            ch.index(),
            if on { "ON" } else { "OFF" },
            staged
        );

        let mut messages = Vec::with_capacity(2);
        let mut report = None;
        let readback = bus.read_register(self.output_reg);
        match readback {
            Ok(value) => {
                if value != staged {
                    warn!(
                        "Sync: read-back mismatch, wrote 0x{:02X} read 0x{:02X}",
                        staged, value
                    );
                    report = Some(SyncReport::VerifyMismatch {
                        written: staged,
                        readback: value,
                    });
                } else {
                    debug!("Sync: read-back 0x{:02X} ok", value);
                }
                // Reported states come from the masks, not from `value`.
                messages.push(OutboundMessage::RelayStateVerified {
                    relay: ch.index(),
                    exio_pin: ch.exio_pin(),
                    expected_state: self.bank.expected_on(ch),
                    actual_state: self.bank.is_on(ch),
                });
            }
            Err(e) => {
                warn!("Sync: read-back failed: {}", e);
                report = Some(SyncReport::ReadbackFailed(e));
            }
        }

        messages.push(ack(relay, on, Ok(())));
        SyncOutcome {
            result: Ok(ch),
            readback: Some(readback),
            messages,
            report,
        }
    }
}

fn ack(relay: i64, state: bool, result: Result<(), SyncError>) -> OutboundMessage {
    OutboundMessage::RelayControlAck {
        relay,
        state,
        success: result.is_ok(),
        error: result.err().map(|e| e.to_string()),
    }
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event to the logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { relays, outputs_ok } => {
                info!(
                    "START | relays=0b{:08b} | outputs={}",
                    relays,
                    if *outputs_ok { "OK" } else { "UNCONFIRMED" }
                );
            }
            AppEvent::RelayApplied { channel, on, mask } => {
                info!(
                    "RELAY | ch={} {} | mask=0b{:08b}",
                    channel,
                    if *on { "ON" } else { "OFF" },
                    mask
                );
            }
            AppEvent::RelayFailed { relay, on, error } => {
                warn!(
                    "RELAY | ch={} {} FAILED | {}",
                    relay,
                    if *on { "ON" } else { "OFF" },
                    error
                );
            }
            AppEvent::VerifyMismatch { written, readback } => {
                warn!("VERIFY | wrote=0b{:08b} read=0b{:08b}", written, readback);
            }
            AppEvent::InputsChanged { mask } => {
                info!("INPUT | mask=0b{:08b}", mask);
            }
            AppEvent::LinkUp => info!("LINK | up"),
            AppEvent::LinkDown => warn!("LINK | down"),
            AppEvent::MessageRejected(e) => {
                warn!("MSG | rejected | {} ({})", e, e.wire_tag());
            }
            AppEvent::ConfigUpdated(change) => {
                info!(
                    "CONFIG | updated | identity={} wifi={} server={}",
                    change.identity, change.wifi, change.server
                );
            }
            AppEvent::ConfigRejected(reason) => {
                warn!("CONFIG | rejected | {}", reason);
            }
        }
    }
}

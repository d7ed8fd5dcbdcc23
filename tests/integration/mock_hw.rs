//! Mock adapters for integration tests.
//!
//! Records every register transaction and every message sent to the
//! server so tests can assert on the full history without touching real
//! I2C or sockets.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use relaynode::app::events::AppEvent;
use relaynode::app::ports::{
    ConfigError, ConfigPort, ConsolePort, EventSink, InputPort, Link, LinkError, LinkEvent,
    RegisterBus,
};
use relaynode::config::DeviceConfig;
use relaynode::error::BusError;
use relaynode::protocol::OutboundMessage;

// ── Bus transaction record ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCall {
    Write { reg: u8, value: u8 },
    Read { reg: u8 },
}

// ── MockBoard ─────────────────────────────────────────────────

/// Relay output register plus the eight input lines.
pub struct MockBoard {
    pub calls: Vec<BusCall>,
    /// Latched register contents, indexed by register number.
    pub regs: [u8; 4],
    pub fail_writes: bool,
    pub fail_reads: bool,
    /// When set, reads return this instead of the latched value.
    pub readback_override: Option<u8>,
    /// Logical input mask returned by `sample`.
    pub inputs: u8,
    pub samples: usize,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            regs: [0; 4],
            fail_writes: false,
            fail_reads: false,
            readback_override: None,
            inputs: 0,
            samples: 0,
        }
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                BusCall::Write { reg, value } => Some((reg, value)),
                BusCall::Read { .. } => None,
            })
            .collect()
    }

    pub fn output(&self) -> u8 {
        self.regs[1]
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for MockBoard {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        self.calls.push(BusCall::Write { reg, value });
        if self.fail_writes {
            return Err(BusError::Nack);
        }
        self.regs[usize::from(reg & 0x03)] = value;
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, BusError> {
        self.calls.push(BusCall::Read { reg });
        if self.fail_reads {
            return Err(BusError::Nack);
        }
        Ok(self
            .readback_override
            .unwrap_or(self.regs[usize::from(reg & 0x03)]))
    }
}

impl InputPort for MockBoard {
    fn sample(&mut self, _previous: u8) -> u8 {
        self.samples += 1;
        self.inputs
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    pub accept: bool,
    pub fail_send: bool,
    pub events: VecDeque<LinkEvent>,
    pub sent: Vec<String>,
    pub connects: Vec<String>,
    pub disconnects: usize,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self {
            accept: true,
            fail_send: false,
            events: VecDeque::new(),
            sent: Vec::new(),
            connects: Vec::new(),
            disconnects: 0,
        }
    }

    /// Queue one text frame from the server.
    pub fn push_text(&mut self, text: &str) {
        self.events.push_back(LinkEvent::Text(text.to_string()));
    }

    /// Decode and drain everything sent so far.
    pub fn take_sent(&mut self) -> Vec<OutboundMessage> {
        self.sent
            .drain(..)
            .map(|t| serde_json::from_str(&t).expect("sent text must be a valid message"))
            .collect()
    }

    pub fn kinds(messages: &[OutboundMessage]) -> Vec<&'static str> {
        messages.iter().map(OutboundMessage::kind).collect()
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Link for MockLink {
    fn connect(&mut self, uri: &str) -> Result<(), LinkError> {
        self.connects.push(uri.to_string());
        let ev = if self.accept {
            LinkEvent::Connected
        } else {
            LinkEvent::Disconnected
        };
        self.events.push_back(ev);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }

    fn send(&mut self, text: &str) -> Result<(), LinkError> {
        if self.fail_send {
            return Err(LinkError::SendFailed);
        }
        self.sent.push(text.to_string());
        Ok(())
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }
}

// ── MockConfigStore ───────────────────────────────────────────

pub struct MockConfigStore {
    pub saved: RefCell<Option<DeviceConfig>>,
    pub saves: Cell<usize>,
    pub fail_save: Cell<bool>,
}

#[allow(dead_code)]
impl MockConfigStore {
    pub fn new() -> Self {
        Self {
            saved: RefCell::new(None),
            saves: Cell::new(0),
            fail_save: Cell::new(false),
        }
    }
}

impl Default for MockConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for MockConfigStore {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        if self.fail_save.get() {
            return Err(ConfigError::IoError);
        }
        config.validate()?;
        self.saves.set(self.saves.get() + 1);
        *self.saved.borrow_mut() = Some(config.clone());
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockConsole ───────────────────────────────────────────────

pub struct MockConsole {
    pub input: VecDeque<String>,
    pub output: Vec<String>,
}

#[allow(dead_code)]
impl MockConsole {
    pub fn new() -> Self {
        Self {
            input: VecDeque::new(),
            output: Vec::new(),
        }
    }
}

impl Default for MockConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePort for MockConsole {
    fn poll_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn write_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}

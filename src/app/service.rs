//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the relay bank (through the [`SyncEngine`]), the
//! input snapshot, the connection manager and the active configuration.
//! The main loop calls [`AppService::poll`] once per iteration with the
//! current uptime; all I/O flows through port traits injected at call
//! sites, so the whole service runs against mock adapters on the host.
//!
//! ```text
//!  RegisterBus ◀──┐ ┌──────────────────────────┐ ┌──▶ Link (server)
//!                 ├─│        AppService        │─┤
//!  InputPort ─────┘ │ Sync · Inputs · Conn mgr │ └──▶ EventSink
//!  ConfigPort ◀────▶└──────────────────────────┘
//! ```
//!
//! Peer-bound messages are queued in an outbox and flushed at the end of
//! each poll.  Nothing is queued while disconnected.

use log::{debug, error, info, warn};

use crate::config::{ConfigChange, ConfigPatch, DeviceConfig, TimingConfig};
use crate::connection::{BackoffPolicy, ConnectionManager, ConnectionState, FixedCooldown, Transition};
use crate::inputs::InputBank;
use crate::protocol::codec;
use crate::protocol::messages::OutboundMessage;
use crate::relay::bank::RELAY_COUNT;
use crate::relay::sync::{SyncEngine, SyncOutcome, SyncReport};
use crate::timing::{Interval, Throttle};

use super::commands::{ConsoleCommand, InboundCommand};
use super::events::AppEvent;
use super::ports::{
    ConfigError, ConfigPort, ConsolePort, EventSink, InputPort, Link, LinkEvent, NetworkInfo,
    RegisterBus,
};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<B = FixedCooldown> {
    config: DeviceConfig,
    timing: TimingConfig,
    network: NetworkInfo,
    network_up: bool,
    sync: SyncEngine,
    inputs: InputBank,
    connection: ConnectionManager<B>,
    heartbeat: Interval,
    input_poll: Interval,
    /// Shared throttle for bus-health `error_report`s.
    bus_reports: Throttle,
    outbox: Vec<OutboundMessage>,
    pending_restart: Option<ConfigChange>,
}

impl AppService {
    /// Service with the fixed reconnect cooldown from `timing`.
    pub fn new(config: DeviceConfig, timing: TimingConfig) -> Self {
        let policy = FixedCooldown::from_timing(&timing);
        Self::with_backoff(config, timing, policy)
    }
}

impl<B: BackoffPolicy> AppService<B> {
    pub fn with_backoff(config: DeviceConfig, timing: TimingConfig, policy: B) -> Self {
        Self {
            config,
            timing,
            network: NetworkInfo::default(),
            network_up: false,
            sync: SyncEngine::new(),
            inputs: InputBank::new(),
            connection: ConnectionManager::new(policy),
            heartbeat: Interval::new(timing.broadcast_interval_ms),
            input_poll: Interval::new(timing.input_poll_interval_ms),
            bus_reports: Throttle::new(timing.error_report_interval_ms),
            outbox: Vec::new(),
            pending_restart: None,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn network(&self) -> &NetworkInfo {
        &self.network
    }

    pub fn relay_mask(&self) -> u8 {
        self.sync.bank().current()
    }

    pub fn relay_states(&self) -> [bool; RELAY_COUNT] {
        self.sync.bank().states()
    }

    pub fn input_states(&self) -> [bool; RELAY_COUNT] {
        self.inputs.states()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the outputs to the all-off boot state.  A bus failure here
    /// is logged and tolerated; later requests retry the bus.
    pub fn start(&mut self, bus: &mut impl RegisterBus, sink: &mut impl EventSink) {
        let outputs_ok = self.sync.sync_outputs(bus).is_ok();
        if !outputs_ok {
            warn!("AppService: outputs not confirmed at boot");
        }
        sink.emit(&AppEvent::Started {
            relays: self.sync.bank().current(),
            outputs_ok,
        });
        info!(
            "AppService started as '{}' ({})",
            self.config.device_name, self.config.device_id
        );
    }

    /// Record network reachability and addresses.  Losing the network
    /// tears the link down; regaining it allows an immediate connect.
    pub fn set_network(
        &mut self,
        up: bool,
        info: NetworkInfo,
        link: &mut impl Link,
        sink: &mut impl EventSink,
    ) {
        self.network = info;
        if up == self.network_up {
            return;
        }
        self.network_up = up;
        if up {
            info!("Net: up, ip={}", self.network.ip);
            self.connection.reset();
        } else {
            warn!("Net: down");
            self.drop_link(link, sink);
        }
    }

    /// Close the link and reconnect as soon as possible, e.g. after the
    /// server address changed.
    pub fn restart_link(&mut self, link: &mut impl Link, sink: &mut impl EventSink) {
        self.drop_link(link, sink);
        self.connection.reset();
    }

    /// Network-affecting config changes accumulated since the last call.
    pub fn take_network_restart(&mut self) -> Option<ConfigChange> {
        self.pending_restart.take()
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// Run one cooperative step: link events, connection upkeep, input
    /// sampling, heartbeat, then flush queued messages.
    ///
    /// `hw` satisfies both [`RegisterBus`] and [`InputPort`], which avoids
    /// a double mutable borrow of the board adapter.
    pub fn poll(
        &mut self,
        now_ms: u64,
        hw: &mut (impl RegisterBus + InputPort),
        link: &mut impl Link,
        store: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        // 1. Drain link events in arrival order
        while let Some(event) = link.poll_event() {
            match self.connection.on_event(&event) {
                Transition::Up => self.on_link_up(now_ms, sink),
                Transition::Down => self.on_link_down(sink),
                Transition::None => {}
            }
            if let LinkEvent::Text(text) = event {
                self.handle_message(now_ms, &text, hw, store, sink);
            }
        }

        // 2. Connection upkeep
        if self.network_up {
            let uri = self.config.server_uri();
            self.connection.poll(now_ms, link, &uri);
        }

        // 3. Input sampling
        if self.input_poll.ready(now_ms) {
            let mask = hw.sample(self.inputs.mask());
            if self.inputs.update(mask) {
                debug!("Inputs: 0b{:08b}", mask);
                sink.emit(&AppEvent::InputsChanged { mask });
            }
        }

        // 4. Heartbeat
        if self.is_connected() && self.heartbeat.ready(now_ms) {
            self.emit(self.state_message());
        }

        // 5. Flush
        self.flush(link, sink);
    }

    /// Decode and act on one inbound text message.
    pub fn handle_message(
        &mut self,
        now_ms: u64,
        text: &str,
        bus: &mut impl RegisterBus,
        store: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) {
        let command = match codec::decode(text) {
            Ok(command) => command,
            Err(e) => {
                warn!("Link: dropped inbound message: {}", e);
                sink.emit(&AppEvent::MessageRejected(e));
                self.emit(OutboundMessage::error_report(e.wire_tag(), e.to_string()));
                return;
            }
        };

        match command {
            InboundCommand::RelayControl { relay, state } => {
                self.apply_relay(now_ms, relay, state, bus, sink);
            }
            InboundCommand::Config(data) => {
                let (success, message) = match self.apply_patch(&data, store, sink) {
                    Ok(_) => (true, String::from("configuration updated")),
                    Err(e) => (false, e.to_string()),
                };
                self.emit(OutboundMessage::ConfigResponse { success, message });
            }
            InboundCommand::Ping => {
                self.emit(OutboundMessage::Pong {
                    device_id: self.config.device_id.as_str().into(),
                    uptime_ms: now_ms,
                });
            }
        }
    }

    /// Run one relay request through the sync engine, queue its messages
    /// and, on success, an immediate snapshot.
    pub fn apply_relay(
        &mut self,
        now_ms: u64,
        relay: i64,
        on: bool,
        bus: &mut impl RegisterBus,
        sink: &mut impl EventSink,
    ) -> SyncOutcome {
        let outcome = self.sync.apply(bus, relay, on);

        match outcome.result {
            Ok(ch) => sink.emit(&AppEvent::RelayApplied {
                channel: ch.index(),
                on,
                mask: self.sync.bank().current(),
            }),
            Err(error) => sink.emit(&AppEvent::RelayFailed { relay, on, error }),
        }

        for msg in &outcome.messages {
            self.emit(msg.clone());
        }

        if let Some(report) = outcome.report {
            if let SyncReport::VerifyMismatch { written, readback } = report {
                sink.emit(&AppEvent::VerifyMismatch { written, readback });
            }
            self.report(now_ms, report);
        }

        if outcome.applied() {
            self.emit(self.state_message());
            self.heartbeat.restart(now_ms);
        }
        outcome
    }

    /// Handle one line from the provisioning console.
    pub fn handle_console_line(
        &mut self,
        line: &str,
        store: &impl ConfigPort,
        console: &mut impl ConsolePort,
        sink: &mut impl EventSink,
    ) {
        match ConsoleCommand::parse(line) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Show => {
                for l in self.describe_config() {
                    console.write_line(&l);
                }
            }
            ConsoleCommand::Patch(data) => match self.apply_patch(&data, store, sink) {
                Ok(_) => console.write_line("OK: configuration saved"),
                Err(e) => console.write_line(&format!("ERROR: {e}")),
            },
            ConsoleCommand::Invalid => {
                console.write_line("ERROR: expected 'show' or a JSON config object");
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────

    fn on_link_up(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::LinkUp);
        self.emit(self.register_message());
        self.emit(self.state_message());
        self.heartbeat.restart(now_ms);
    }

    fn on_link_down(&mut self, sink: &mut impl EventSink) {
        self.outbox.clear();
        sink.emit(&AppEvent::LinkDown);
    }

    fn drop_link(&mut self, link: &mut impl Link, sink: &mut impl EventSink) {
        if self.connection.drop_link(link) == Transition::Down {
            self.on_link_down(sink);
        }
    }

    /// Type-check, validate, persist, then adopt a patch.  Nothing changes
    /// unless every step succeeds.
    fn apply_patch(
        &mut self,
        data: &serde_json::Value,
        store: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<ConfigChange, ConfigError> {
        let mut next = self.config.clone();
        let result = ConfigPatch::from_json(data)
            .and_then(|patch| next.apply(&patch))
            .and_then(|change| next.validate().map(|()| change))
            .and_then(|change| store.save(&next).map(|()| change));

        let change = match result {
            Ok(change) => change,
            Err(e) => {
                warn!("Config: patch rejected: {}", e);
                sink.emit(&AppEvent::ConfigRejected(rejection_reason(e)));
                return Err(e);
            }
        };

        self.config = next;
        info!("Config: updated ({:?})", change);
        sink.emit(&AppEvent::ConfigUpdated(change));

        if change.needs_network_restart() {
            let pending = self.pending_restart.get_or_insert_default();
            pending.identity |= change.identity;
            pending.wifi |= change.wifi;
            pending.server |= change.server;
        }
        if change.identity {
            self.emit(self.register_message());
        }
        Ok(change)
    }

    fn report(&mut self, now_ms: u64, report: SyncReport) {
        if report.is_rate_limited() && !self.bus_reports.allow(now_ms) {
            debug!("Sync: {} report suppressed", report.error_type());
            return;
        }
        self.emit(OutboundMessage::error_report(report.error_type(), report.message()));
    }

    fn register_message(&self) -> OutboundMessage {
        OutboundMessage::Register {
            device_id: self.config.device_id.as_str().into(),
            device_name: self.config.device_name.as_str().into(),
            mac: self.network.mac.clone(),
            ip: self.network.ip.clone(),
        }
    }

    fn state_message(&self) -> OutboundMessage {
        OutboundMessage::State {
            device_id: self.config.device_id.as_str().into(),
            mac: self.network.mac.clone(),
            ip: self.network.ip.clone(),
            inputs: self.inputs.states(),
            relays: self.sync.bank().states(),
        }
    }

    fn describe_config(&self) -> Vec<String> {
        let c = &self.config;
        vec![
            format!("device_id     = {}", c.device_id),
            format!("device_name   = {}", c.device_name),
            format!("wifi_ssid     = {}", c.wifi_ssid),
            format!("wifi_password = {}", c.masked_password()),
            format!("server        = {}", c.server_uri()),
        ]
    }

    /// Queue a message for the peer; dropped while disconnected.
    fn emit(&mut self, msg: OutboundMessage) {
        if self.is_connected() {
            self.outbox.push(msg);
        } else {
            debug!("Link: offline, dropping {}", msg.kind());
        }
    }

    fn flush(&mut self, link: &mut impl Link, sink: &mut impl EventSink) {
        let pending = core::mem::take(&mut self.outbox);
        for msg in pending {
            let text = match codec::encode(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Link: could not encode {}: {}", msg.kind(), e);
                    continue;
                }
            };
            if let Err(e) = link.send(&text) {
                warn!("Link: send of {} failed ({}), dropping link", msg.kind(), e);
                self.drop_link(link, sink);
                return;
            }
        }
    }
}

fn rejection_reason(e: ConfigError) -> &'static str {
    match e {
        ConfigError::ValidationFailed(msg) => msg,
        ConfigError::StorageFull => "storage full",
        ConfigError::NotFound | ConfigError::Corrupted | ConfigError::IoError => {
            "could not persist configuration"
        }
    }
}

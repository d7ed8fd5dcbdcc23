//! WebSocket client link to the server.
//!
//! Implements [`Link`].  Transport callbacks run on the client's own task,
//! so they only push [`LinkEvent`]s into a bounded `embassy-sync` channel;
//! the main loop drains it through [`Link::poll_event`].  When the queue is
//! full the newest event is dropped and logged.
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::ws::client::EspWebSocketClient`
//!   with its built-in reconnect disabled; pacing belongs to the
//!   connection manager.
//! - **host**: an in-process fake server for tests.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{debug, warn};

use crate::app::ports::{Link, LinkError, LinkEvent};

#[cfg(target_os = "espidf")]
use esp_idf_svc::ws::FrameType;
#[cfg(target_os = "espidf")]
use esp_idf_svc::ws::client::{
    EspWebSocketClient, EspWebSocketClientConfig, WebSocketEvent, WebSocketEventType,
};

/// Handshake and send timeout on device.
#[cfg(target_os = "espidf")]
const WS_TIMEOUT: core::time::Duration = core::time::Duration::from_secs(10);

/// Events buffered between transport callbacks and the main loop.
pub const LINK_EVENT_DEPTH: usize = 16;

type LinkEvents = Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_DEPTH>;

pub struct WsLink {
    events: Arc<LinkEvents>,
    #[cfg(target_os = "espidf")]
    client: Option<EspWebSocketClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimServer,
}

#[cfg(not(target_os = "espidf"))]
struct SimServer {
    accepting: bool,
    open: bool,
    received: Vec<String>,
}

impl Default for WsLink {
    fn default() -> Self {
        Self::new()
    }
}

impl WsLink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Channel::new()),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimServer {
                accepting: true,
                open: false,
                received: Vec::new(),
            },
        }
    }

    // ── Simulation controls ───────────────────────────────────

    /// Simulation: whether the fake server accepts connections.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_accepting(&mut self, accepting: bool) {
        self.sim.accepting = accepting;
    }

    /// Simulation: deliver a text frame from the server.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_push_text(&mut self, text: &str) {
        push_event(&self.events, LinkEvent::Text(text.into()));
    }

    /// Simulation: the server closes the connection.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_close(&mut self) {
        if self.sim.open {
            self.sim.open = false;
            push_event(&self.events, LinkEvent::Disconnected);
        }
    }

    /// Simulation: everything the server has received so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_take_received(&mut self) -> Vec<String> {
        core::mem::take(&mut self.sim.received)
    }
}

fn push_event(events: &LinkEvents, event: LinkEvent) {
    if let Err(TrySendError::Full(dropped)) = events.try_send(event) {
        let kind = match dropped {
            LinkEvent::Connected => "connected",
            LinkEvent::Disconnected => "disconnected",
            LinkEvent::Text(_) => "text",
        };
        warn!("Link: event queue full, dropped {} event", kind);
    }
}

#[cfg(target_os = "espidf")]
fn forward_event(events: &LinkEvents, event: &Result<WebSocketEvent<'_>, esp_idf_svc::io::EspIOError>) {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            warn!("Link: transport error {:?}", e);
            return;
        }
    };
    let mapped = match event.event_type {
        WebSocketEventType::Connected => Some(LinkEvent::Connected),
        WebSocketEventType::Disconnected | WebSocketEventType::Closed => {
            Some(LinkEvent::Disconnected)
        }
        WebSocketEventType::Text(text) => Some(LinkEvent::Text(text.into())),
        WebSocketEventType::Binary(_) => {
            debug!("Link: ignoring binary frame");
            None
        }
        _ => None,
    };
    if let Some(ev) = mapped {
        push_event(events, ev);
    }
}

impl Link for WsLink {
    #[cfg(target_os = "espidf")]
    fn connect(&mut self, uri: &str) -> Result<(), LinkError> {
        // Dropping the old client closes it.
        self.client = None;
        let config = EspWebSocketClientConfig {
            disable_auto_reconnect: true,
            ..Default::default()
        };
        let events = Arc::clone(&self.events);
        match EspWebSocketClient::new(uri, &config, WS_TIMEOUT, move |event| {
            forward_event(&events, event)
        }) {
            Ok(client) => {
                log::info!("Link: client started for {}", uri);
                self.client = Some(client);
                Ok(())
            }
            Err(e) => {
                warn!("Link: client start failed: {:?}", e);
                Err(LinkError::ConnectFailed)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn connect(&mut self, uri: &str) -> Result<(), LinkError> {
        debug!("Link(sim): connecting to {}", uri);
        self.sim.open = self.sim.accepting;
        let ev = if self.sim.open {
            LinkEvent::Connected
        } else {
            LinkEvent::Disconnected
        };
        push_event(&self.events, ev);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn disconnect(&mut self) {
        if self.client.take().is_some() {
            log::info!("Link: client closed");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn disconnect(&mut self) {
        self.sim.open = false;
    }

    #[cfg(target_os = "espidf")]
    fn send(&mut self, text: &str) -> Result<(), LinkError> {
        let client = self.client.as_mut().ok_or(LinkError::NotConnected)?;
        if !client.is_connected() {
            return Err(LinkError::NotConnected);
        }
        client
            .send(FrameType::Text(false), text.as_bytes())
            .map_err(|_| LinkError::SendFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn send(&mut self, text: &str) -> Result<(), LinkError> {
        if !self.sim.open {
            return Err(LinkError::NotConnected);
        }
        self.sim.received.push(text.into());
        Ok(())
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.events.try_receive().ok()
    }
}

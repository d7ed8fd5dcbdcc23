//! Server connection lifecycle.
//!
//! [`ConnectionManager`] owns the [`ConnectionState`] of the single link to
//! the server.  It decides when to (re)connect, using a pluggable
//! [`BackoffPolicy`], and turns raw [`LinkEvent`]s into state
//! [`Transition`]s the service reacts to (register + snapshot on `Up`).
//!
//! ```text
//!   Disconnected ──connect()──▶ (attempt in flight) ──Connected──▶ Connected
//!        ▲                               │                              │
//!        └────────── Disconnected ───────┴──────── Disconnected ────────┘
//! ```

pub mod backoff;

use log::{info, warn};

use crate::app::ports::{Link, LinkError, LinkEvent};
pub use backoff::{BackoffPolicy, FixedCooldown, Immediate};

/// An attempt with no outcome after this long no longer blocks retries.
pub const ATTEMPT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// What a link event did to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No state change.
    None,
    /// The link just came up.
    Up,
    /// An established link went down.
    Down,
}

pub struct ConnectionManager<B> {
    state: ConnectionState,
    policy: B,
    last_attempt_ms: Option<u64>,
    in_flight: bool,
    failed_attempts: u32,
}

impl<B: BackoffPolicy> ConnectionManager<B> {
    pub fn new(policy: B) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
            last_attempt_ms: None,
            in_flight: false,
            failed_attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Whether [`poll`](Self::poll) would start an attempt at `now_ms`.
    pub fn attempt_due(&self, now_ms: u64) -> bool {
        if self.is_connected() {
            return false;
        }
        let Some(last) = self.last_attempt_ms else {
            return true;
        };
        let elapsed = now_ms.saturating_sub(last);
        if self.in_flight && elapsed < ATTEMPT_TIMEOUT_MS {
            return false;
        }
        elapsed >= self.policy.delay_ms(self.failed_attempts)
    }

    /// Start a connect attempt if one is due.  Returns the attempt's
    /// immediate result, or `None` if nothing was attempted.
    pub fn poll<L: Link>(
        &mut self,
        now_ms: u64,
        link: &mut L,
        uri: &str,
    ) -> Option<Result<(), LinkError>> {
        if !self.attempt_due(now_ms) {
            return None;
        }
        if self.in_flight {
            warn!("Link: attempt timed out, retrying");
            self.failed_attempts = self.failed_attempts.saturating_add(1);
        }
        self.last_attempt_ms = Some(now_ms);
        info!("Link: connecting to {} (attempt {})", uri, self.failed_attempts + 1);

        let result = link.connect(uri);
        match result {
            Ok(()) => self.in_flight = true,
            Err(e) => {
                warn!("Link: connect failed: {}", e);
                self.in_flight = false;
                self.failed_attempts = self.failed_attempts.saturating_add(1);
            }
        }
        Some(result)
    }

    /// Fold one link event into the connection state.
    pub fn on_event(&mut self, event: &LinkEvent) -> Transition {
        match event {
            LinkEvent::Connected => {
                self.in_flight = false;
                self.failed_attempts = 0;
                if self.is_connected() {
                    return Transition::None;
                }
                self.state = ConnectionState::Connected;
                info!("Link: connected");
                Transition::Up
            }
            LinkEvent::Disconnected => {
                self.in_flight = false;
                if self.is_connected() {
                    self.state = ConnectionState::Disconnected;
                    warn!("Link: disconnected");
                    Transition::Down
                } else {
                    self.failed_attempts = self.failed_attempts.saturating_add(1);
                    Transition::None
                }
            }
            LinkEvent::Text(_) => Transition::None,
        }
    }

    /// Tear the link down locally (send failure, network loss).
    pub fn drop_link<L: Link>(&mut self, link: &mut L) -> Transition {
        link.disconnect();
        self.in_flight = false;
        if self.is_connected() {
            self.state = ConnectionState::Disconnected;
            Transition::Down
        } else {
            Transition::None
        }
    }

    /// Forget pacing history so the next poll connects immediately.
    /// Used when the target changes.
    pub fn reset(&mut self) {
        self.last_attempt_ms = None;
        self.in_flight = false;
        self.failed_attempts = 0;
    }
}

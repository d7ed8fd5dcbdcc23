//! Millisecond gates for periodic work ([`Interval`]) and report rate
//! limiting ([`Throttle`]).
//!
//! The main loop passes a monotonic `now_ms` into every check; nothing
//! here reads a clock, so behaviour is fully deterministic under test.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use burster::Limiter;

/// Fires at most once per `period_ms`.
///
/// The first check after construction (or [`reset`](Self::reset)) fires
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl Interval {
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Returns `true` and restarts the period if it has elapsed.
    pub fn ready(&mut self, now_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if now_ms.saturating_sub(last) < self.period_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    /// Restart the period from `now_ms` without firing.
    pub fn restart(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    /// Forget history; the next check fires.
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

// ───────────────────────────────────────────────────────────────
// Throttle
// ───────────────────────────────────────────────────────────────

type TimeProvider = Box<dyn Fn() -> Duration>;

/// Token-bucket gate: allows one event, then at most one more per
/// `period_ms`.
///
/// The bucket reads a virtual clock on which one loop millisecond is one
/// second, and refills one token per virtual second.  An event costs a
/// full period's worth of tokens, so refill granularity stays at 1 ms.
pub struct Throttle {
    clock: Rc<Cell<u64>>,
    bucket: burster::TokenBucket<TimeProvider>,
    cost: u64,
}

impl Throttle {
    pub fn new(period_ms: u64) -> Self {
        let clock = Rc::new(Cell::new(0));
        let reader = Rc::clone(&clock);
        let provider: TimeProvider = Box::new(move || Duration::from_secs(reader.get()));
        let cost = period_ms.max(1);
        Self {
            clock,
            // 1 token per second, `cost` burst capacity
            bucket: burster::TokenBucket::new_with_time_provider(1, cost, provider),
            cost,
        }
    }

    /// Returns `true` if an event at `now_ms` may go out, consuming the
    /// allowance.  A clock that steps backwards is held at its maximum.
    pub fn allow(&mut self, now_ms: u64) -> bool {
        self.clock.set(now_ms.max(self.clock.get()));
        self.bucket.try_consume(self.cost).is_ok()
    }
}

impl core::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Throttle")
            .field("period_ms", &self.cost)
            .field("now_ms", &self.clock.get())
            .finish_non_exhaustive()
    }
}

//! Reconnect pacing policies.

use crate::config::TimingConfig;

/// Decides how long to wait after a connect attempt before the next one.
pub trait BackoffPolicy {
    /// Minimum gap in ms after the most recent attempt, given how many
    /// attempts in a row have failed so far.
    fn delay_ms(&self, failed_attempts: u32) -> u64;
}

/// The same cooldown after every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCooldown {
    pub cooldown_ms: u64,
}

impl FixedCooldown {
    pub const fn new(cooldown_ms: u64) -> Self {
        Self { cooldown_ms }
    }

    pub const fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.reconnect_cooldown_ms)
    }
}

impl Default for FixedCooldown {
    fn default() -> Self {
        Self::from_timing(&TimingConfig::default())
    }
}

impl BackoffPolicy for FixedCooldown {
    fn delay_ms(&self, _failed_attempts: u32) -> u64 {
        self.cooldown_ms
    }
}

/// Retry on every loop iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Immediate;

impl BackoffPolicy for Immediate {
    fn delay_ms(&self, _failed_attempts: u32) -> u64 {
        0
    }
}

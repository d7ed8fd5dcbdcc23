//! Digital input sampling.
//!
//! Inputs are opto-isolated and pulled up, so a LOW line means the input
//! is active.  The sampler inverts that once; everything above it sees
//! `true` = active.  No debouncing: each sample overwrites the snapshot.

use embedded_hal::digital::InputPin;
use log::debug;

use crate::app::ports::InputPort;
use crate::relay::bank::{RELAY_COUNT, mask_to_bools};

/// Number of digital input channels.
pub const INPUT_COUNT: usize = RELAY_COUNT;

/// Last sampled input mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputBank {
    last: Option<u8>,
}

impl InputBank {
    pub const fn new() -> Self {
        Self { last: None }
    }

    pub const fn is_sampled(&self) -> bool {
        self.last.is_some()
    }

    /// Current mask; unsampled inputs read as inactive.
    pub fn mask(&self) -> u8 {
        self.last.unwrap_or(0)
    }

    /// Store a fresh sample.  Returns `true` if any channel changed.
    pub fn update(&mut self, mask: u8) -> bool {
        let changed = self.last != Some(mask);
        self.last = Some(mask);
        changed
    }

    pub fn states(&self) -> [bool; INPUT_COUNT] {
        mask_to_bools(self.mask())
    }
}

/// Reads eight [`InputPin`]s, channel 0 first.
pub struct InputSampler<P> {
    pins: [P; INPUT_COUNT],
}

impl<P: InputPin> InputSampler<P> {
    pub fn new(pins: [P; INPUT_COUNT]) -> Self {
        Self { pins }
    }
}

impl<P: InputPin> InputPort for InputSampler<P> {
    fn sample(&mut self, previous: u8) -> u8 {
        let mut mask = previous;
        for (i, pin) in self.pins.iter_mut().enumerate() {
            match pin.is_low() {
                Ok(true) => mask |= 1 << i,
                Ok(false) => mask &= !(1 << i),
                Err(_) => debug!("Inputs: channel {} read failed, keeping last value", i),
            }
        }
        mask
    }
}

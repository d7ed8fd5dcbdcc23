//! Hardware adapter: bridges the relay outputs and input lines to the
//! domain port traits.
//!
//! Owns the output driver (expander or direct GPIO) and the input
//! sampler, exposing them through [`RegisterBus`] and [`InputPort`] so the
//! service can take both as one `&mut` borrow.

use crate::app::ports::{InputPort, RegisterBus};
use crate::error::BusError;

/// Concrete adapter that combines the board I/O behind port traits.
pub struct HardwareAdapter<O, I> {
    outputs: O,
    inputs: I,
}

impl<O: RegisterBus, I: InputPort> HardwareAdapter<O, I> {
    pub fn new(outputs: O, inputs: I) -> Self {
        Self { outputs, inputs }
    }

    pub fn outputs_mut(&mut self) -> &mut O {
        &mut self.outputs
    }
}

// ── RegisterBus implementation ────────────────────────────────

impl<O: RegisterBus, I> RegisterBus for HardwareAdapter<O, I> {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        self.outputs.write_register(reg, value)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, BusError> {
        self.outputs.read_register(reg)
    }
}

// ── InputPort implementation ──────────────────────────────────

impl<O, I: InputPort> InputPort for HardwareAdapter<O, I> {
    fn sample(&mut self, previous: u8) -> u8 {
        self.inputs.sample(previous)
    }
}

//! Relay outputs wired straight to GPIOs.
//!
//! Emulates the expander's output register over eight
//! [`StatefulOutputPin`]s so the sync engine is identical on both board
//! variants.  Read-back queries each pin's latched output level.
//!
//! A register write is all-or-nothing: if any pin refuses its level, the
//! pins already driven are put back to where they were.

use embedded_hal::digital::StatefulOutputPin;
use log::warn;

use crate::app::ports::RegisterBus;
use crate::error::BusError;
use crate::pins::EXPANDER_REG_OUTPUT;
use crate::relay::bank::RELAY_COUNT;

pub struct GpioOutputBank<P> {
    pins: [P; RELAY_COUNT],
    active_low: bool,
}

impl<P: StatefulOutputPin> GpioOutputBank<P> {
    /// `active_low` boards energise a relay by pulling its pin low.
    pub fn new(pins: [P; RELAY_COUNT], active_low: bool) -> Self {
        Self { pins, active_low }
    }

    fn latched_levels(&mut self) -> Result<[bool; RELAY_COUNT], BusError> {
        let mut levels = [false; RELAY_COUNT];
        for (level, pin) in levels.iter_mut().zip(self.pins.iter_mut()) {
            *level = pin.is_set_high().map_err(|_| BusError::Other)?;
        }
        Ok(levels)
    }
}

fn drive<P: StatefulOutputPin>(pin: &mut P, high: bool) -> Result<(), P::Error> {
    if high { pin.set_high() } else { pin.set_low() }
}

impl<P: StatefulOutputPin> RegisterBus for GpioOutputBank<P> {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        if reg != EXPANDER_REG_OUTPUT {
            return Err(BusError::Other);
        }
        let previous = self.latched_levels()?;
        for i in 0..RELAY_COUNT {
            let on = value & (1 << i) != 0;
            if drive(&mut self.pins[i], on != self.active_low).is_err() {
                warn!("Relays: GPIO for channel {} did not accept level", i);
                for (j, pin) in self.pins[..i].iter_mut().enumerate() {
                    if drive(pin, previous[j]).is_err() {
                        warn!("Relays: GPIO for channel {} could not be restored", j);
                    }
                }
                return Err(BusError::Other);
            }
        }
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, BusError> {
        if reg != EXPANDER_REG_OUTPUT {
            return Err(BusError::NoData);
        }
        let mut mask = 0u8;
        for (i, pin) in self.pins.iter_mut().enumerate() {
            let high = pin.is_set_high().map_err(|_| BusError::NoData)?;
            if high != self.active_low {
                mask |= 1 << i;
            }
        }
        Ok(mask)
    }
}

//! TCA9554 8-bit I²C GPIO expander driving the relay coils.
//!
//! Register map:
//!
//! | Reg  | Name     | Use here                          |
//! |------|----------|-----------------------------------|
//! | 0x00 | Input    | unused                            |
//! | 0x01 | Output   | relay mask, bit n → EXIO(n+1)     |
//! | 0x02 | Polarity | cleared (no inversion)            |
//! | 0x03 | Config   | 0x00, all pins outputs            |
//!
//! Generic over [`embedded_hal::i2c::I2c`]; on device this is the
//! esp-idf-hal `I2cDriver`, on host any mock.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use log::{info, warn};

use crate::app::ports::RegisterBus;
use crate::error::BusError;
use crate::pins::{
    EXPANDER_I2C_ADDR, EXPANDER_REG_CONFIG, EXPANDER_REG_OUTPUT, EXPANDER_REG_POLARITY,
};

pub struct Tca9554<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Tca9554<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, EXPANDER_I2C_ADDR)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Drive every output low, clear polarity inversion, then switch all
    /// eight pins to outputs.  Output is written first so no relay
    /// glitches on when the direction flips.
    pub fn init(&mut self) -> Result<(), BusError> {
        self.write_register(EXPANDER_REG_OUTPUT, 0x00)?;
        self.write_register(EXPANDER_REG_POLARITY, 0x00)?;
        self.write_register(EXPANDER_REG_CONFIG, 0x00)?;
        info!("Expander: TCA9554 @0x{:02X} ready, all relays off", self.address);
        Ok(())
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for Tca9554<I2C> {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        self.i2c.write(self.address, &[reg, value]).map_err(|e| {
            warn!("Expander: write reg 0x{:02X} failed: {:?}", reg, e.kind());
            bus_error(e.kind())
        })
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| {
                warn!("Expander: read reg 0x{:02X} failed: {:?}", reg, e.kind());
                bus_error(e.kind())
            })?;
        Ok(buf[0])
    }
}

fn bus_error(kind: ErrorKind) -> BusError {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusError::Nack,
        _ => BusError::Other,
    }
}

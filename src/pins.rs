//! GPIO / peripheral assignments for the 8-channel relay board.
//!
//! Single source of truth: every driver references this module rather
//! than hard-coding pin numbers or register addresses.

// ---------------------------------------------------------------------------
// I²C bus to the relay expander
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 42;
pub const I2C_SCL_GPIO: i32 = 41;
/// Standard-mode bus clock.
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// TCA9554 8-bit expander (relay coils on EXIO1..EXIO8)
// ---------------------------------------------------------------------------

/// 7-bit address with A0..A2 strapped low.
pub const EXPANDER_I2C_ADDR: u8 = 0x20;

pub const EXPANDER_REG_INPUT: u8 = 0x00;
/// Bit n drives EXIO(n+1), which switches relay n.
pub const EXPANDER_REG_OUTPUT: u8 = 0x01;
pub const EXPANDER_REG_POLARITY: u8 = 0x02;
/// 0 = output, 1 = input, per bit.
pub const EXPANDER_REG_CONFIG: u8 = 0x03;

// ---------------------------------------------------------------------------
// Digital inputs (opto-isolated, active LOW with pull-ups)
// ---------------------------------------------------------------------------

/// DI1..DI8, channel 0 first.
pub const INPUT_GPIOS: [i32; 8] = [4, 5, 6, 7, 8, 9, 10, 11];

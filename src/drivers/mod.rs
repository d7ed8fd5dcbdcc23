//! Output drivers and the task watchdog.

pub mod expander;
pub mod gpio_outputs;
pub mod watchdog;

pub use expander::Tca9554;
pub use gpio_outputs::GpioOutputBank;

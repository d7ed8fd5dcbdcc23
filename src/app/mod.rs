//! Application core: relay sync orchestration, zero direct I/O.
//!
//! The [`service::AppService`] ties the relay bank, input snapshot,
//! connection manager and configuration together.  All interaction with
//! hardware and the network happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

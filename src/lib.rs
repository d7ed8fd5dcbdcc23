//! RelayNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod connection;
pub mod drivers;
pub mod error;
pub mod inputs;
pub mod pins;
pub mod protocol;
pub mod relay;
pub mod timing;

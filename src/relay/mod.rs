//! Relay state and the write/verify discipline that keeps it in step with
//! the output hardware.

pub mod bank;
pub mod sync;

pub use bank::{Channel, RELAY_COUNT, RelayBank, mask_to_bools};
pub use sync::{SyncEngine, SyncOutcome, SyncReport};

//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                  |
//! |-------------|---------------------|------------------------------|
//! | `hardware`  | RegisterBus         | TCA9554 expander / GPIO bank |
//! |             | InputPort           | Opto-isolated input lines    |
//! | `log_sink`  | EventSink           | Serial log output            |
//! | `nvs`       | ConfigPort          | NVS / in-memory store        |
//! | `ws_link`   | Link                | WebSocket client             |
//! | `wifi`      | ConnectivityPort    | ESP-IDF WiFi STA             |
//! | `console`   | ConsolePort         | stdin / UART console         |
//! | `time`      |                     | ESP32 system timer           |
//! | `device_id` |                     | Factory MAC in eFuse         |

pub mod console;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
pub mod ws_link;

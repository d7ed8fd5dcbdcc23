//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the board if the relay loop stalls.  The loop calls `feed()`
//! once per iteration; a bus transaction that hangs past the timeout
//! reboots into the all-off state.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Stall timeout before the TWDT panics the task.
pub const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Subscribe the calling task to the TWDT.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain FFI calls with a stack-local config; a null task
            // handle means "the calling task".
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: WATCHDOG_TIMEOUT_MS,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("Watchdog: reconfigure returned {} (already configured?)", ret);
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms timeout)", WATCHDOG_TIMEOUT_MS);
                } else {
                    log::warn!("Watchdog: subscribe failed, running unguarded");
                }
                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): no-op");
            Self {}
        }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the task subscribed in `new`.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}

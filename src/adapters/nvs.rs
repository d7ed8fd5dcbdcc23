//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] by storing one postcard-encoded
//! [`ConfigRecord`] blob.  The record's magic and version guard against
//! reading a layout written by other firmware.
//!
//! - **`target_os = "espidf"`**: raw `nvs_*` calls on the default
//!   partition.  Each commit is atomic, so power loss mid-save leaves the
//!   previous record intact.
//! - **host**: an in-memory map, for tests and simulation.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{ConfigRecord, DeviceConfig};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use std::ffi::CString;

const CONFIG_NAMESPACE: &str = "relaynode";
const CONFIG_KEY: &str = "devcfg";

/// Upper bound on the stored record; anything larger is treated as corrupt.
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// A partition with no free pages or from a newer NVS version is
    /// erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    // ── Blob primitives ───────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self
            .store
            .borrow()
            .get(&Self::composite_key(namespace, key))
            .cloned())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    /// Open a namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = CString::new(namespace).map_err(|_| ESP_ERR_INVALID_ARG)?;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        // SAFETY: `handle` was opened above and is closed exactly once.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        let key = CString::new(key).map_err(|_| ConfigError::IoError)?;
        let result = Self::with_nvs_handle(namespace, false, |handle| {
            let mut size: usize = 0;
            // SAFETY: a null buffer asks NVS for the stored size only.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr(), core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }
            let mut buf = vec![0u8; size];
            // SAFETY: `buf` holds exactly `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr(), buf.as_mut_ptr().cast(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A namespace that was never written fails to open read-only.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let key = CString::new(key).map_err(|_| ConfigError::IoError)?;
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: `data` is a valid slice for the duration of the call.
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr(), data.as_ptr().cast(), data.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // SAFETY: same open handle.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsAdapter: write error {}", e);
            if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                ConfigError::StorageFull
            } else {
                ConfigError::IoError
            }
        })
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        let Some(bytes) = self.read_blob(CONFIG_NAMESPACE, CONFIG_KEY)? else {
            info!("NvsAdapter: no stored config, using defaults");
            return Ok(DeviceConfig::default());
        };
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::Corrupted);
        }
        match ConfigRecord::decode(&bytes) {
            Ok(config) => {
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(config)
            }
            Err(e) => {
                warn!("NvsAdapter: stored config rejected: {}", e);
                Err(e)
            }
        }
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = ConfigRecord::new(config.clone()).encode()?;
        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

//! Device identity derived from the ESP32 factory MAC address.
//!
//! The server keys boards by MAC, so an unprovisioned board reports
//! `RELAY-XXYYZZ` (last three MAC bytes) as its `device_id`.

use core::fmt::Write;

use crate::config::DeviceIdString;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x94, 0xA9, 0x90, 0x23, 0x06, 0x80]
}

/// Colon-separated uppercase form, as reported in `register`/`state`.
pub fn mac_string(mac: &MacAddress) -> String {
    let mut s = String::with_capacity(17);
    for (i, b) in mac.iter().enumerate() {
        if i > 0 {
            s.push(':');
        }
        let _ = write!(s, "{:02X}", b);
    }
    s
}

/// Default `device_id`: `RELAY-XXYYZZ`.
pub fn default_device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "RELAY-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

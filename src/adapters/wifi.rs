//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the boundary for network association.
//! Association itself is a black box: the adapter starts it, watches for
//! the station to come up, and retries at a fixed cadence forever.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi`, driven
//!   non-blocking from the main loop.
//! - **all other targets**: a simulated access point for host tests.

use core::fmt;
use std::net::Ipv4Addr;

use log::{info, warn};

use crate::app::ports::ConfigError;
use crate::config::{DeviceConfig, PasswordString, SsidString};
use crate::timing::Interval;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

pub trait ConnectivityPort {
    /// Start associating with the configured network.
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    /// Leave the network and stop retrying until `connect` is called.
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Advance the association state machine.
    fn poll(&mut self, now_ms: u64);
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    /// Station address once DHCP has completed.
    fn ip_address(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    /// Not trying: no credentials, or explicitly disconnected.
    Idle,
    /// Association started, waiting for the station to come up.
    Connecting,
    Connected,
    /// Waiting out the retry interval before the next attempt.
    Waiting,
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: SsidString,
    password: PasswordString,
    retry: Interval,
    /// An attempt was started outside `poll`; its timeout is armed on the
    /// next poll, which carries the real time.
    retry_unarmed: bool,
    attempts: u32,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    /// Simulation: whether the fake AP accepts associations.
    #[cfg(not(target_os = "espidf"))]
    sim_ap_available: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
    /// Simulation: the AP takes attempts but never completes association.
    #[cfg(not(target_os = "espidf"))]
    sim_stalled: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>, retry_interval_ms: u64) -> Self {
        Self {
            state: WifiState::Idle,
            ssid: SsidString::new(),
            password: PasswordString::new(),
            retry: Interval::new(retry_interval_ms),
            retry_unarmed: false,
            attempts: 0,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(retry_interval_ms: u64) -> Self {
        Self {
            state: WifiState::Idle,
            ssid: SsidString::new(),
            password: PasswordString::new(),
            retry: Interval::new(retry_interval_ms),
            retry_unarmed: false,
            attempts: 0,
            sim_ap_available: true,
            sim_associated: false,
            sim_stalled: false,
        }
    }

    /// Load credentials from the device config.  An empty SSID leaves the
    /// adapter idle.
    pub fn configure(&mut self, config: &DeviceConfig) -> Result<(), ConfigError> {
        if !config.has_wifi_credentials() {
            info!("WiFi: no SSID provisioned");
            return Ok(());
        }
        self.set_credentials(&config.wifi_ssid, &config.wifi_password)
            .map_err(|e| match e {
                ConnectivityError::InvalidPassword => {
                    ConfigError::ValidationFailed("wifi_password must be empty or 8-64 bytes")
                }
                _ => ConfigError::ValidationFailed("wifi_ssid must be 1-32 printable ASCII bytes"),
            })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Start one association attempt.  `now_ms` is `None` when called from
    /// `connect`, which has no clock.
    fn attempt(&mut self, now_ms: Option<u64>) {
        self.attempts = self.attempts.saturating_add(1);
        match now_ms {
            Some(now) => self.retry.restart(now),
            None => self.retry_unarmed = true,
        }
        info!("WiFi: connecting to '{}' (attempt {})", self.ssid, self.attempts);
        match self.platform_connect() {
            Ok(()) => self.state = WifiState::Connecting,
            Err(e) => {
                warn!("WiFi: attempt failed: {}", e);
                self.state = WifiState::Waiting;
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&conf)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi
                .start()
                .map_err(|_| ConnectivityError::ConnectionFailed)?;
        }
        self.wifi
            .connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if !self.sim_ap_available {
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim_associated = !self.sim_stalled;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect returned {:?}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim_associated = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_associated
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        let info = self.wifi.sta_netif().get_ip_info().ok()?;
        let ip = Ipv4Addr::from(info.ip.octets());
        (!ip.is_unspecified()).then_some(ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.sim_associated.then_some(Ipv4Addr::new(192, 168, 1, 50))
    }

    // ── Simulation controls ───────────────────────────────────

    /// Simulation: make the fake AP accept or refuse associations.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_ap_available(&mut self, available: bool) {
        self.sim_ap_available = available;
    }

    /// Simulation: accept attempts without ever associating.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_stalled(&mut self, stalled: bool) {
        self.sim_stalled = stalled;
    }

    /// Simulation: drop the current association as if the AP vanished.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&mut self) {
        self.sim_associated = false;
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Ok(());
        }
        self.attempt(None);
        match self.state {
            WifiState::Waiting => Err(ConnectivityError::ConnectionFailed),
            _ => Ok(()),
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Idle;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    fn poll(&mut self, now_ms: u64) {
        if self.retry_unarmed {
            self.retry.restart(now_ms);
            self.retry_unarmed = false;
        }
        match self.state {
            WifiState::Idle => {}
            WifiState::Connecting => {
                if self.platform_is_connected() {
                    self.state = WifiState::Connected;
                    self.attempts = 0;
                    info!("WiFi: connected, ip={:?}", self.platform_ip());
                } else if self.retry.ready(now_ms) {
                    warn!("WiFi: association timed out");
                    self.platform_disconnect();
                    self.attempt(Some(now_ms));
                }
            }
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi: connection lost");
                    self.state = WifiState::Waiting;
                    self.retry.restart(now_ms);
                }
            }
            WifiState::Waiting => {
                if self.retry.ready(now_ms) {
                    self.attempt(Some(now_ms));
                }
            }
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        if ssid.is_empty() || !ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && !(8..=64).contains(&password.len()) {
            return Err(ConnectivityError::InvalidPassword);
        }
        self.ssid = SsidString::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password =
            PasswordString::try_from(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        if self.is_connected() {
            self.platform_ip()
        } else {
            None
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

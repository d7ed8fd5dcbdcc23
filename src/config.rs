//! Device configuration and timing parameters.
//!
//! [`DeviceConfig`] is the provisioned identity and network target.  It is
//! loaded once at boot from NVS (or built from compile-time defaults) and
//! rewritten only when a `config` command or a console line is accepted.
//!
//! The persisted form is a [`ConfigRecord`]: a magic number and layout
//! version in front of the postcard-encoded config.  A record with the
//! wrong magic or version is treated as absent and reset to defaults.

use heapless::String as HString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::ports::ConfigError;

/// `"RLAY"` in ASCII.
pub const CONFIG_MAGIC: u32 = 0x524C_4159;
/// Bump whenever a field is added, removed, or resized.
pub const CONFIG_VERSION: u16 = 2;

pub type DeviceIdString = HString<32>;
pub type NameString = HString<64>;
pub type SsidString = HString<32>;
pub type PasswordString = HString<64>;
pub type HostString = HString<64>;

/// Default WebSocket port the server accepts relay boards on.
pub const DEFAULT_SERVER_PORT: u16 = 40_000;

// ───────────────────────────────────────────────────────────────
// DeviceConfig
// ───────────────────────────────────────────────────────────────

/// Provisioned identity and connection target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Identifier the server keys this board by.  Empty means "derive from
    /// the factory MAC at boot".
    pub device_id: DeviceIdString,
    /// Human-readable label shown in the server UI.
    pub device_name: NameString,
    pub wifi_ssid: SsidString,
    pub wifi_password: PasswordString,
    pub server_host: HostString,
    pub server_port: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let server_port = option_env!("SERVER_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_SERVER_PORT);

        Self {
            device_id: bounded(option_env!("RELAY_DEVICE_ID").unwrap_or("")),
            device_name: bounded(option_env!("RELAY_DEVICE_NAME").unwrap_or("Relay Controller")),
            wifi_ssid: bounded(option_env!("WIFI_SSID").unwrap_or("")),
            wifi_password: bounded(option_env!("WIFI_PASSWORD").unwrap_or("")),
            server_host: bounded(option_env!("SERVER_HOST").unwrap_or("192.168.1.100")),
            server_port,
        }
    }
}

/// Build-time defaults that do not fit are dropped rather than cut.
fn bounded<const N: usize>(s: &str) -> HString<N> {
    HString::try_from(s).unwrap_or_default()
}

impl DeviceConfig {
    /// WebSocket URI of the server endpoint.
    pub fn server_uri(&self) -> String {
        format!("ws://{}:{}/", self.server_host, self.server_port)
    }

    /// Whether enough is provisioned to attempt WiFi association.
    pub fn has_wifi_credentials(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }

    /// Password with everything but the length hidden, for console output.
    pub fn masked_password(&self) -> String {
        "*".repeat(self.wifi_password.len())
    }

    /// Validate `patch`, then apply every present field.
    ///
    /// Either the whole patch is applied or nothing is.
    pub fn apply(&mut self, patch: &ConfigPatch) -> Result<ConfigChange, ConfigError> {
        patch.validate()?;

        let mut next = self.clone();
        if let Some(v) = &patch.device_id {
            next.device_id = copy_field(v, "device_id too long")?;
        }
        if let Some(v) = &patch.device_name {
            next.device_name = copy_field(v, "device_name too long")?;
        }
        if let Some(v) = &patch.wifi_ssid {
            next.wifi_ssid = copy_field(v, "wifi_ssid too long")?;
        }
        if let Some(v) = &patch.wifi_password {
            next.wifi_password = copy_field(v, "wifi_password too long")?;
        }
        if let Some(v) = &patch.server_host {
            next.server_host = copy_field(v, "server_host too long")?;
        }
        if let Some(port) = patch.server_port {
            next.server_port = port;
        }

        let change = ConfigChange {
            identity: next.device_id != self.device_id || next.device_name != self.device_name,
            wifi: next.wifi_ssid != self.wifi_ssid || next.wifi_password != self.wifi_password,
            server: next.server_host != self.server_host || next.server_port != self.server_port,
        };
        *self = next;
        Ok(change)
    }

    /// Range and charset checks applied before every save.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_printable_ascii(&self.device_id) || !is_printable_ascii(&self.device_name) {
            return Err(ConfigError::ValidationFailed("identity must be printable ASCII"));
        }
        if !self.wifi_ssid.is_empty() {
            validate_ssid(&self.wifi_ssid)?;
        }
        validate_password(&self.wifi_password)?;
        validate_host(&self.server_host)?;
        if self.server_port == 0 {
            return Err(ConfigError::ValidationFailed("server_port must be 1-65535"));
        }
        Ok(())
    }
}

fn copy_field<const N: usize>(v: &str, msg: &'static str) -> Result<HString<N>, ConfigError> {
    HString::try_from(v).map_err(|_| ConfigError::ValidationFailed(msg))
}

// ───────────────────────────────────────────────────────────────
// Partial updates
// ───────────────────────────────────────────────────────────────

/// The `data` object of an inbound `config` message (and the JSON form
/// accepted on the serial console).  Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub wifi_ssid: Option<String>,
    pub wifi_password: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
}

impl ConfigPatch {
    /// Pick the known fields out of a JSON object.
    ///
    /// A field of the wrong JSON type is a validation failure, not a parse
    /// error, so the sender still gets a `config_response`.  Unknown keys
    /// and `null` values are ignored.
    pub fn from_json(data: &Value) -> Result<Self, ConfigError> {
        let obj = data
            .as_object()
            .ok_or(ConfigError::ValidationFailed("config data must be a JSON object"))?;
        Ok(Self {
            device_id: text_field(obj, "device_id", "device_id must be a string")?,
            device_name: text_field(obj, "device_name", "device_name must be a string")?,
            wifi_ssid: text_field(obj, "wifi_ssid", "wifi_ssid must be a string")?,
            wifi_password: text_field(obj, "wifi_password", "wifi_password must be a string")?,
            server_host: text_field(obj, "server_host", "server_host must be a string")?,
            server_port: port_field(obj)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::ValidationFailed("no configuration fields supplied"));
        }
        if let Some(id) = &self.device_id {
            if id.is_empty() || id.len() > 32 || !is_printable_ascii(id) {
                return Err(ConfigError::ValidationFailed(
                    "device_id must be 1-32 printable ASCII bytes",
                ));
            }
        }
        if let Some(name) = &self.device_name {
            if name.is_empty() || name.len() > 64 || !is_printable_ascii(name) {
                return Err(ConfigError::ValidationFailed(
                    "device_name must be 1-64 printable ASCII bytes",
                ));
            }
        }
        if let Some(ssid) = &self.wifi_ssid {
            validate_ssid(ssid)?;
        }
        if let Some(pw) = &self.wifi_password {
            validate_password(pw)?;
        }
        if let Some(host) = &self.server_host {
            validate_host(host)?;
        }
        if self.server_port == Some(0) {
            return Err(ConfigError::ValidationFailed("server_port must be 1-65535"));
        }
        Ok(())
    }
}

fn text_field(
    obj: &Map<String, Value>,
    key: &str,
    msg: &'static str,
) -> Result<Option<String>, ConfigError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::ValidationFailed(msg)),
    }
}

/// Ports must be JSON integers; `"8080"` and `8080.0` are both rejected.
fn port_field(obj: &Map<String, Value>) -> Result<Option<u16>, ConfigError> {
    match obj.get("server_port") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .map(Some)
            .ok_or(ConfigError::ValidationFailed("server_port must be 1-65535")),
    }
}

/// Which groups of settings an accepted patch actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChange {
    pub identity: bool,
    pub wifi: bool,
    pub server: bool,
}

impl ConfigChange {
    pub fn needs_network_restart(&self) -> bool {
        self.wifi || self.server
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::ValidationFailed(
            "wifi_ssid must be 1-32 printable ASCII bytes",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConfigError::ValidationFailed(
            "wifi_password must be empty or 8-64 bytes",
        ));
    }
    Ok(())
}

fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() || host.len() > 64 {
        return Err(ConfigError::ValidationFailed("server_host must be 1-64 bytes"));
    }
    if !host.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-') {
        return Err(ConfigError::ValidationFailed(
            "server_host may only contain letters, digits, '.' and '-'",
        ));
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Persisted record
// ───────────────────────────────────────────────────────────────

/// Fixed-layout persisted form of [`DeviceConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub magic: u32,
    pub version: u16,
    pub config: DeviceConfig,
}

impl ConfigRecord {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            config,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::IoError)
    }

    /// Decode and check the guard fields.  A wrong magic or version is
    /// reported as [`ConfigError::Corrupted`].
    pub fn decode(bytes: &[u8]) -> Result<DeviceConfig, ConfigError> {
        let record: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        if record.magic != CONFIG_MAGIC || record.version != CONFIG_VERSION {
            return Err(ConfigError::Corrupted);
        }
        Ok(record.config)
    }
}

// ───────────────────────────────────────────────────────────────
// Timing
// ───────────────────────────────────────────────────────────────

/// Loop cadences, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Unconditional full-state heartbeat while connected.
    pub broadcast_interval_ms: u64,
    /// Input line sampling period.
    pub input_poll_interval_ms: u64,
    /// Minimum gap between server reconnect attempts (0 = immediate).
    pub reconnect_cooldown_ms: u64,
    /// Minimum gap between generic bus `error_report`s.
    pub error_report_interval_ms: u64,
    /// Gap between WiFi association attempts.
    pub wifi_retry_interval_ms: u64,
    /// Boot-time wait for console provisioning lines.
    pub provisioning_window_ms: u64,
    /// Sleep between main-loop iterations.
    pub loop_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: 500,
            input_poll_interval_ms: 100,
            reconnect_cooldown_ms: 60_000,
            error_report_interval_ms: 30_000,
            wifi_retry_interval_ms: 10_000,
            provisioning_window_ms: 3_000,
            loop_interval_ms: 10,
        }
    }
}

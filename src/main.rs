//! RelayNode Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink   NvsAdapter   Esp32Time     │
//! │  (RegisterBus+Input) (EventSink)    (ConfigPort) (uptime)      │
//! │  WifiAdapter         WsLink         StdioConsole               │
//! │  (Connectivity)      (Link)         (ConsolePort)              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Relay sync · Inputs · Connection manager · Codec      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, Input, IOPin, PinDriver, Pull};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::wifi::EspWifi;

use relaynode::adapters::console::StdioConsole;
use relaynode::adapters::device_id;
use relaynode::adapters::hardware::HardwareAdapter;
use relaynode::adapters::log_sink::LogEventSink;
use relaynode::adapters::nvs::NvsAdapter;
use relaynode::adapters::time::Esp32TimeAdapter;
use relaynode::adapters::wifi::{ConnectivityPort, WifiAdapter};
use relaynode::adapters::ws_link::WsLink;
use relaynode::app::ports::{ConfigError, ConfigPort, ConsolePort, NetworkInfo};
use relaynode::app::service::AppService;
use relaynode::config::{DeviceConfig, TimingConfig};
use relaynode::drivers::expander::Tca9554;
use relaynode::drivers::watchdog::Watchdog;
use relaynode::inputs::InputSampler;
use relaynode::pins;

/// Address reported before DHCP completes.
const NO_IP: &str = "0.0.0.0";

fn input_pin(pin: AnyIOPin) -> Result<PinDriver<'static, AnyIOPin, Input>> {
    let mut driver = PinDriver::input(pin)?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let watchdog = Watchdog::new();
    let clock = Esp32TimeAdapter::new();
    let timing = TimingConfig::default();
    let mut log_sink = LogEventSink::new();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;
    let mut config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::Corrupted) => {
            warn!("Config: stored record unusable, resetting to defaults");
            let cfg = DeviceConfig::default();
            if let Err(e) = nvs.save(&cfg) {
                warn!("Config: could not store defaults: {}", e);
            }
            cfg
        }
        Err(e) => {
            warn!("Config: load failed ({}), using defaults", e);
            DeviceConfig::default()
        }
    };

    // ── 3. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    if config.device_id.is_empty() {
        config.device_id = device_id::default_device_id(&mac);
    }
    let mac_text = device_id::mac_string(&mac);
    info!("Device ID: {} (MAC {})", config.device_id, mac_text);

    let mut app = AppService::new(config, timing);

    // ── 4. Provisioning window ────────────────────────────────
    let mut console = StdioConsole::spawn();
    let window_end = clock.uptime_ms() + timing.provisioning_window_ms;
    info!(
        "Console: provisioning window open for {} ms",
        timing.provisioning_window_ms
    );
    while clock.uptime_ms() < window_end {
        while let Some(line) = console.poll_line() {
            app.handle_console_line(&line, &nvs, &mut console, &mut log_sink);
        }
        watchdog.feed();
        FreeRtos::delay_ms(50);
    }
    // Nothing is running yet, so there is nothing to restart.
    let _ = app.take_network_restart();

    // ── 5. Relay outputs (TCA9554 on I2C) ─────────────────────
    let io = peripherals.pins;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        io.gpio42,
        io.gpio41,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let mut expander = Tca9554::new(i2c);
    if let Err(e) = expander.init() {
        warn!(
            "Expander: init at 0x{:02X} failed ({}), relays unavailable until the bus recovers",
            expander.address(),
            e
        );
    }

    // ── 6. Digital inputs ─────────────────────────────────────
    let inputs = InputSampler::new([
        input_pin(io.gpio4.downgrade())?,
        input_pin(io.gpio5.downgrade())?,
        input_pin(io.gpio6.downgrade())?,
        input_pin(io.gpio7.downgrade())?,
        input_pin(io.gpio8.downgrade())?,
        input_pin(io.gpio9.downgrade())?,
        input_pin(io.gpio10.downgrade())?,
        input_pin(io.gpio11.downgrade())?,
    ]);
    info!("Inputs: GPIO {:?}, active low", pins::INPUT_GPIOS);

    let mut hw = HardwareAdapter::new(expander, inputs);

    // ── 7. WiFi station ───────────────────────────────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop, None)?;
    let mut wifi = WifiAdapter::new(esp_wifi, timing.wifi_retry_interval_ms);
    if let Err(e) = wifi.configure(app.config()) {
        warn!("WiFi: stored credentials rejected: {}", e);
    } else if let Err(e) = wifi.connect() {
        warn!("WiFi: {}", e);
    }

    // ── 8. App service ────────────────────────────────────────
    let mut link = WsLink::new();
    app.start(&mut hw, &mut log_sink);

    info!("System ready. Entering main loop.");

    // ── 9. Main loop ──────────────────────────────────────────
    let loop_delay_ms = u32::try_from(timing.loop_interval_ms).unwrap_or(u32::MAX);
    let mut net_up = false;
    let mut net_ip = String::new();

    loop {
        let now_ms = clock.uptime_ms();

        wifi.poll(now_ms);
        let up = wifi.is_connected();
        let ip = wifi
            .ip_address()
            .map_or_else(|| NO_IP.to_string(), |ip| ip.to_string());
        if up != net_up || ip != net_ip {
            net_up = up;
            net_ip.clone_from(&ip);
            let info = NetworkInfo {
                mac: mac_text.clone(),
                ip,
            };
            app.set_network(up, info, &mut link, &mut log_sink);
        }

        while let Some(line) = console.poll_line() {
            app.handle_console_line(&line, &nvs, &mut console, &mut log_sink);
        }

        app.poll(now_ms, &mut hw, &mut link, &nvs, &mut log_sink);

        if let Some(change) = app.take_network_restart() {
            if change.wifi {
                info!("WiFi: credentials changed, reassociating");
                wifi.disconnect();
                if let Err(e) = wifi.configure(app.config()) {
                    warn!("WiFi: {}", e);
                } else if let Err(e) = wifi.connect() {
                    warn!("WiFi: {}", e);
                }
            }
            if change.server {
                info!("Link: server changed, reconnecting to {}", app.config().server_uri());
                app.restart_link(&mut link, &mut log_sink);
            }
        }

        watchdog.feed();
        FreeRtos::delay_ms(loop_delay_ms);
    }
}

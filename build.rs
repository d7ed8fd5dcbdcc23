fn main() {
    // Provisioning defaults baked in at compile time (see config::DeviceConfig).
    for key in [
        "RELAY_DEVICE_ID",
        "RELAY_DEVICE_NAME",
        "WIFI_SSID",
        "WIFI_PASSWORD",
        "SERVER_HOST",
        "SERVER_PORT",
    ] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

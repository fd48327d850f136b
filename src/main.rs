//! WiFi keeper demo firmware.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use wifi_keeper_esp32::{EspWifiSupervisor, StationProfile};

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("=== WiFi keeper starting ===");

    let peripherals = match Peripherals::take() {
        Ok(peripherals) => peripherals,
        Err(err) => {
            log::error!("failed to take peripherals: {}", err);
            return;
        }
    };
    let sysloop = match EspSystemEventLoop::take() {
        Ok(sysloop) => sysloop,
        Err(err) => {
            log::error!("failed to take system event loop: {}", err);
            return;
        }
    };

    // Credentials are baked in at build time for the demo
    let ssid = option_env!("WIFI_SSID").unwrap_or("");
    let secret = option_env!("WIFI_PASS").unwrap_or("");
    let mut profile = StationProfile::new(ssid, secret).with_hostname("wifi-keeper");
    if let Err(err) = profile.validate() {
        log::warn!("profile: {}", err);
        profile.auto_connect = false;
    }

    let wifi = match EspWifiSupervisor::new(peripherals.modem, sysloop, profile) {
        Ok(wifi) => wifi,
        Err(err) => {
            log::error!("failed to set up WiFi supervisor: {}", err);
            return;
        }
    };
    wifi.enable_verbose_logging(true);
    wifi.on_connection_established(|| log::info!("connection established"));
    wifi.on_connection_lost(|| log::warn!("connection lost"));

    loop {
        std::thread::sleep(std::time::Duration::from_secs(10));
        log::info!("state: {}, connected: {}", wifi.state(), wifi.is_connected());
    }
}

// Host: just initialize env_logger and explain
#[cfg(not(feature = "esp32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("This binary requires the 'esp32' feature.");
    log::info!("Use 'cargo test' for host testing.");
}

//! Station-mode WiFi connection supervisor for ESP32.
//!
//! The supervisor core is platform-independent and can be tested on the host
//! machine without hardware; the ESP-IDF wiring lives behind the `esp32`
//! feature.

pub mod config;
pub mod platform;
pub mod supervisor;

// Re-export commonly used items
pub use config::{ProfileError, StationProfile};
pub use platform::{RadioDriver, RadioEvent, RadioMode, TimerControl, TimerId};
pub use supervisor::{LinkState, WifiSupervisor, INITIAL_SETTLE_DELAY, RETRY_DELAY};

#[cfg(feature = "esp32")]
pub use platform::esp::EspWifiSupervisor;

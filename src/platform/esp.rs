//! ESP-IDF implementations of the platform contracts.
//!
//! [`EspRadio`] drives the ESP-IDF WiFi driver, [`EspTimers`] wraps two
//! one-shot timers from the esp_timer service, and [`EspWifiSupervisor`]
//! wires both plus the system event loop to a shared
//! [`WifiSupervisor`](crate::supervisor::WifiSupervisor).
//!
//! ESP-IDF delivers timer callbacks and system events on different tasks, so
//! the shared handle guards the supervisor with a mutex; the callbacks hold
//! only weak references and detach silently once the handle is dropped.

use std::ffi::CString;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::handle::RawHandle;
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::timer::{EspTaskTimerService, EspTimer};
use esp_idf_svc::wifi::{
    AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent,
};
use esp_idf_sys::EspError;
use log::{debug, info, warn};

use super::{RadioDriver, RadioEvent, RadioMode, TimerControl, TimerId};
use crate::config::StationProfile;
use crate::supervisor::{LinkState, WifiSupervisor};

/// ESP-IDF WiFi driver adapter.
///
/// All operations are fire-and-forget as required by [`RadioDriver`]:
/// driver errors are logged and the outcome is reported through the system
/// event loop.
pub struct EspRadio {
    wifi: EspWifi<'static>,
}

type ApConfiguration = esp_idf_svc::wifi::AccessPointConfiguration;

impl EspRadio {
    /// Create the adapter, taking ownership of the modem peripheral.
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, None)?;
        Ok(Self { wifi })
    }

    /// Split the current driver configuration into its station and AP parts.
    fn parts(&self) -> (Option<ClientConfiguration>, Option<ApConfiguration>) {
        match self.wifi.get_configuration() {
            Ok(Configuration::None) | Err(_) => (None, None),
            Ok(Configuration::Client(client)) => (Some(client), None),
            Ok(Configuration::AccessPoint(ap)) => (None, Some(ap)),
            Ok(Configuration::Mixed(client, ap)) => (Some(client), Some(ap)),
        }
    }

    /// Apply a station configuration, preserving any AP part already set.
    fn apply_client(&mut self, client: ClientConfiguration) {
        let (_, ap) = self.parts();
        let next = match ap {
            Some(ap) => Configuration::Mixed(client, ap),
            None => Configuration::Client(client),
        };
        if let Err(err) = self.wifi.set_configuration(&next) {
            warn!("wifi: failed to set driver configuration: {}", err);
        }
    }
}

impl RadioDriver for EspRadio {
    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn connect(&mut self, ssid: &str, secret: Option<&str>) {
        let auth_method = if secret.is_some() {
            AuthMethod::WPA2Personal
        } else {
            AuthMethod::None
        };

        let Ok(ssid) = ssid.try_into() else {
            warn!("wifi: SSID too long for the driver");
            return;
        };
        let Ok(password) = secret.unwrap_or("").try_into() else {
            warn!("wifi: secret too long for the driver");
            return;
        };

        self.apply_client(ClientConfiguration {
            ssid,
            password,
            auth_method,
            ..Default::default()
        });

        if let Err(err) = self.wifi.start() {
            warn!("wifi: failed to start driver: {}", err);
            return;
        }
        if let Err(err) = self.wifi.connect() {
            warn!("wifi: connect request failed: {}", err);
        }
    }

    fn disconnect(&mut self, forget_settings: bool, preserve_mode: bool) {
        // Benign when there is no association; keep it quiet
        if let Err(err) = self.wifi.disconnect() {
            debug!("wifi: disconnect: {}", err);
        }
        if forget_settings {
            self.apply_client(ClientConfiguration::default());
        }
        if !preserve_mode {
            if let Err(err) = self.wifi.stop() {
                debug!("wifi: stop: {}", err);
            }
        }
    }

    fn mode(&self) -> RadioMode {
        let (client, ap) = self.parts();
        RadioMode {
            station: client.is_some(),
            access_point: ap.is_some(),
        }
    }

    fn set_mode(&mut self, mode: RadioMode) {
        let (client, ap) = self.parts();
        let next = match (mode.station, mode.access_point) {
            (false, false) => Configuration::None,
            (true, false) => Configuration::Client(client.unwrap_or_default()),
            (false, true) => Configuration::AccessPoint(ap.unwrap_or_default()),
            (true, true) => {
                Configuration::Mixed(client.unwrap_or_default(), ap.unwrap_or_default())
            }
        };
        if let Err(err) = self.wifi.set_configuration(&next) {
            warn!("wifi: failed to change mode: {}", err);
        }
    }

    fn set_hostname(&mut self, name: &str) {
        let Ok(name) = CString::new(name) else {
            warn!("wifi: hostname contains a NUL byte");
            return;
        };
        // esp-idf-svc exposes no safe setter for the netif hostname
        let result = unsafe {
            esp_idf_sys::esp_netif_set_hostname(self.wifi.sta_netif().handle(), name.as_ptr())
        };
        if result != esp_idf_sys::ESP_OK {
            warn!("wifi: failed to set hostname (error {})", result);
        }
    }
}

/// The supervisor's two one-shot timers, backed by the esp_timer service.
pub struct EspTimers {
    start: EspTimer<'static>,
    retry: EspTimer<'static>,
}

impl EspTimers {
    fn handle(&mut self, id: TimerId) -> &mut EspTimer<'static> {
        match id {
            TimerId::Start => &mut self.start,
            TimerId::Retry => &mut self.retry,
        }
    }
}

impl TimerControl for EspTimers {
    fn arm(&mut self, id: TimerId, delay: std::time::Duration) {
        let timer = self.handle(id);
        let _ = timer.cancel();
        if let Err(err) = timer.after(delay) {
            warn!("wifi: failed to arm {:?} timer: {}", id, err);
        }
    }

    fn disarm(&mut self, id: TimerId) {
        if let Err(err) = self.handle(id).cancel() {
            warn!("wifi: failed to cancel {:?} timer: {}", id, err);
        }
    }
}

/// The supervisor type as instantiated on ESP32.
pub type EspSupervisor = WifiSupervisor<EspRadio, EspTimers>;

/// Slot shared between the owning handle and the platform callbacks. Empty
/// only during construction, before the supervisor is installed.
type SharedSupervisor = Arc<Mutex<Option<EspSupervisor>>>;

/// Owning handle for a supervisor wired to ESP-IDF.
///
/// Dropping the handle drops the event subscriptions and timers with it, so
/// no callback can outlive the supervisor.
///
/// # Example
///
/// ```ignore
/// let peripherals = Peripherals::take()?;
/// let sysloop = EspSystemEventLoop::take()?;
///
/// let profile = StationProfile::new("MyNetwork", "MyPassword");
/// let wifi = EspWifiSupervisor::new(peripherals.modem, sysloop, profile)?;
/// wifi.on_connection_established(|| info!("online"));
/// wifi.on_connection_lost(|| warn!("offline"));
/// ```
pub struct EspWifiSupervisor {
    shared: SharedSupervisor,
    _wifi_subscription: EspSubscription<'static, System>,
    _ip_subscription: EspSubscription<'static, System>,
}

impl EspWifiSupervisor {
    /// Build the radio, timers, and event subscriptions, and install the
    /// supervisor. If the profile has auto-connect set, the first attempt is
    /// already scheduled when this returns.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        profile: StationProfile,
    ) -> Result<Self, PlatformError> {
        let shared: SharedSupervisor = Arc::new(Mutex::new(None));

        let timer_service = EspTaskTimerService::new()?;
        let start = timer_service.timer({
            let shared = Arc::downgrade(&shared);
            move || feed_timer(&shared, TimerId::Start)
        })?;
        let retry = timer_service.timer({
            let shared = Arc::downgrade(&shared);
            move || feed_timer(&shared, TimerId::Retry)
        })?;

        // A DHCP lease means associated, a station disconnect means
        // disassociated; mere link-up without an IP does not count
        let wifi_subscription = sysloop.subscribe::<WifiEvent, _>({
            let shared = Arc::downgrade(&shared);
            move |event| {
                if let WifiEvent::StaDisconnected(payload) = event {
                    debug!("wifi: station disconnected: {:?}", payload);
                    feed_event(&shared, RadioEvent::Disassociated);
                }
            }
        })?;
        let ip_subscription = sysloop.subscribe::<IpEvent, _>({
            let shared = Arc::downgrade(&shared);
            move |event| {
                if let IpEvent::DhcpIpAssigned(assignment) = event {
                    info!("wifi: got ip {}", assignment.ip());
                    feed_event(&shared, RadioEvent::Associated);
                }
            }
        })?;

        let radio = EspRadio::new(modem, sysloop.clone())?;
        let supervisor = WifiSupervisor::new(radio, EspTimers { start, retry }, profile);

        let mut slot = shared.lock().map_err(|_| PlatformError::LockPoisoned)?;
        *slot = Some(supervisor);
        drop(slot);

        Ok(Self {
            shared,
            _wifi_subscription: wifi_subscription,
            _ip_subscription: ip_subscription,
        })
    }

    /// Start a connection. See
    /// [`WifiSupervisor::begin_connection`](crate::supervisor::WifiSupervisor::begin_connection).
    pub fn begin_connection(&self) {
        self.with(|supervisor| supervisor.begin_connection());
    }

    /// Disconnect and suppress automatic reconnection. See
    /// [`WifiSupervisor::disconnect`](crate::supervisor::WifiSupervisor::disconnect).
    pub fn disconnect(&self) {
        self.with(|supervisor| supervisor.disconnect());
    }

    /// Whether the driver currently reports an established connection.
    pub fn is_connected(&self) -> bool {
        self.with(|supervisor| supervisor.is_connected())
            .unwrap_or(false)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.with(|supervisor| supervisor.state())
            .unwrap_or(LinkState::Idle)
    }

    /// Set the SSID and secret.
    pub fn set_credentials(&self, ssid: impl Into<String>, secret: impl Into<String>) {
        let (ssid, secret) = (ssid.into(), secret.into());
        self.with(|supervisor| supervisor.set_credentials(ssid, secret));
    }

    /// Set the hostname applied at the start of the next attempt.
    pub fn set_hostname(&self, hostname: impl Into<String>) {
        let hostname = hostname.into();
        self.with(|supervisor| supervisor.set_hostname(hostname));
    }

    /// Control whether loss of connection triggers an automatic new attempt.
    pub fn set_auto_reconnect(&self, auto_reconnect: bool) {
        self.with(|supervisor| supervisor.set_auto_reconnect(auto_reconnect));
    }

    /// Register the connection-established notification (single slot).
    pub fn on_connection_established(&self, callback: impl FnMut() + Send + 'static) {
        self.with(|supervisor| supervisor.on_connection_established(callback));
    }

    /// Register the connection-lost notification (single slot).
    pub fn on_connection_lost(&self, callback: impl FnMut() + Send + 'static) {
        self.with(|supervisor| supervisor.on_connection_lost(callback));
    }

    /// Enable chatty per-transition diagnostics.
    pub fn enable_verbose_logging(&self, verbose: bool) {
        self.with(|supervisor| supervisor.enable_verbose_logging(verbose));
    }

    fn with<V>(&self, operation: impl FnOnce(&mut EspSupervisor) -> V) -> Option<V> {
        let Ok(mut slot) = self.shared.lock() else {
            warn!("wifi: supervisor lock poisoned");
            return None;
        };
        slot.as_mut().map(operation)
    }
}

fn feed_timer(shared: &Weak<Mutex<Option<EspSupervisor>>>, id: TimerId) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let Ok(mut slot) = shared.lock() else {
        return;
    };
    if let Some(supervisor) = slot.as_mut() {
        supervisor.handle_timer(id);
    }
}

fn feed_event(shared: &Weak<Mutex<Option<EspSupervisor>>>, event: RadioEvent) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let Ok(mut slot) = shared.lock() else {
        return;
    };
    if let Some(supervisor) = slot.as_mut() {
        supervisor.handle_event(event);
    }
}

/// Errors that can occur while wiring the supervisor to ESP-IDF.
#[derive(Debug)]
pub enum PlatformError {
    /// ESP-IDF error during driver, timer, or event-loop setup.
    Esp(EspError),
    /// The shared supervisor lock was poisoned.
    LockPoisoned,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esp(err) => write!(f, "ESP-IDF error: {}", err),
            Self::LockPoisoned => write!(f, "supervisor lock poisoned"),
        }
    }
}

impl std::error::Error for PlatformError {}

impl From<EspError> for PlatformError {
    fn from(err: EspError) -> Self {
        Self::Esp(err)
    }
}

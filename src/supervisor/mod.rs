//! Station connection supervisor.
//!
//! [`WifiSupervisor`] owns the connection lifecycle: it issues connect
//! requests, watches for loss of connectivity, and retries automatically with
//! a stabilization delay. It is a plain state machine over the
//! [`platform`](crate::platform) traits, so the whole module is testable on
//! the host with recording fakes.
//!
//! Three stimuli drive it: [`begin_connection`](WifiSupervisor::begin_connection),
//! radio events via [`handle_event`](WifiSupervisor::handle_event), and timer
//! expiries via [`handle_timer`](WifiSupervisor::handle_timer). All connect
//! requests funnel through one internal attempt path, and all retries funnel
//! through one scheduling path, which is what keeps the invariants small:
//! at most one timer armed at a time, and never a connect request while the
//! radio already reports connected.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::StationProfile;
use crate::platform::{RadioDriver, RadioEvent, RadioMode, TimerControl, TimerId};

/// Delay before the first automatic connection attempt. Radios on some
/// boards are unstable if a connection is attempted right after power-up;
/// waiting lets the radio subsystem settle.
pub const INITIAL_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Delay between a reset and the next connect request. Reconnecting
/// immediately after a disconnection or radio reset is a known source of
/// instability, so every attempt is debounced by this much.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Connection lifecycle state.
///
/// Each state names which timer (if any) is pending and what the radio is
/// expected to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No timer armed, not connected, nothing in flight.
    Idle,
    /// Start timer armed; first attempt will begin when it fires.
    AwaitingInitialDelay,
    /// Retry timer armed; a connect request goes out when it fires.
    AwaitingRetryDelay,
    /// Connect request issued, waiting on the driver.
    Connecting,
    /// The platform reported an established connection.
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingInitialDelay => "awaiting-initial-delay",
            Self::AwaitingRetryDelay => "awaiting-retry-delay",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        write!(f, "{}", name)
    }
}

/// Single-slot notification callback; registering a new one replaces the old.
type Notification = Box<dyn FnMut() + Send>;

/// Station-mode connection supervisor.
///
/// # Example
///
/// ```
/// use wifi_keeper_esp32::{StationProfile, WifiSupervisor};
/// use wifi_keeper_esp32::platform::{RadioDriver, RadioMode, TimerControl, TimerId};
/// # use std::time::Duration;
/// # struct NoRadio;
/// # impl RadioDriver for NoRadio {
/// #     fn is_connected(&self) -> bool { false }
/// #     fn connect(&mut self, _: &str, _: Option<&str>) {}
/// #     fn disconnect(&mut self, _: bool, _: bool) {}
/// #     fn mode(&self) -> RadioMode { RadioMode::STATION }
/// #     fn set_mode(&mut self, _: RadioMode) {}
/// #     fn set_hostname(&mut self, _: &str) {}
/// # }
/// # struct NoTimers;
/// # impl TimerControl for NoTimers {
/// #     fn arm(&mut self, _: TimerId, _: Duration) {}
/// #     fn disarm(&mut self, _: TimerId) {}
/// # }
/// let profile = StationProfile::new("MyNetwork", "MyPassword");
/// let mut supervisor = WifiSupervisor::new(NoRadio, NoTimers, profile);
/// supervisor.on_connection_established(|| log::info!("online"));
/// supervisor.on_connection_lost(|| log::warn!("offline"));
/// ```
///
/// On ESP32, [`EspWifiSupervisor`](crate::platform::esp::EspWifiSupervisor)
/// wires the driver, the system event loop, and the timer service to this
/// type behind a shared handle.
pub struct WifiSupervisor<R: RadioDriver, T: TimerControl> {
    radio: R,
    timers: T,
    profile: StationProfile,
    /// Whether loss of connection schedules a new attempt. Defaults to true;
    /// forced off only by [`disconnect`](Self::disconnect).
    auto_reconnect: bool,
    state: LinkState,
    on_connected: Option<Notification>,
    on_disconnected: Option<Notification>,
    verbose: bool,
}

impl<R: RadioDriver, T: TimerControl> WifiSupervisor<R, T> {
    /// Create a supervisor. If the profile has `auto_connect` set, the start
    /// timer is armed with [`INITIAL_SETTLE_DELAY`] and the first attempt
    /// begins on its own.
    pub fn new(radio: R, timers: T, profile: StationProfile) -> Self {
        let auto_connect = profile.auto_connect;
        let mut supervisor = Self {
            radio,
            timers,
            profile,
            auto_reconnect: true,
            state: LinkState::Idle,
            on_connected: None,
            on_disconnected: None,
            verbose: false,
        };
        if auto_connect {
            supervisor
                .timers
                .arm(TimerId::Start, INITIAL_SETTLE_DELAY);
            supervisor.transition(LinkState::AwaitingInitialDelay);
        }
        supervisor
    }

    /// Start a connection. Idempotent: a call while the radio is already
    /// connected, or before any SSID is set, logs and does nothing. Success
    /// is observable only through the connected/disconnected notifications.
    pub fn begin_connection(&mut self) {
        if !self.can_attempt() {
            return;
        }

        self.disarm_all();

        if self.verbose {
            info!("wifi: initializing connection");
        }

        if let Some(hostname) = self.profile.hostname.as_deref() {
            self.radio.set_hostname(hostname);
        }

        self.schedule_attempt();
    }

    /// Disconnect from the network and stay down: this also turns
    /// auto-reconnect off, so a later disassociation event will not schedule
    /// a retry. [`begin_connection`](Self::begin_connection) does not turn it
    /// back on; use [`set_auto_reconnect`](Self::set_auto_reconnect).
    pub fn disconnect(&mut self) {
        if self.verbose {
            info!("wifi: disconnecting");
        }

        self.auto_reconnect = false;
        self.disarm_all();
        self.reset();
        self.transition(LinkState::Idle);
    }

    /// Feed a radio event in from the platform layer.
    pub fn handle_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::Associated => self.on_associated(),
            RadioEvent::Disassociated => self.on_disassociated(),
        }
    }

    /// Feed a timer expiry in from the platform layer. The timer must have
    /// been armed by this supervisor; spurious expiries for a disarmed timer
    /// are harmless because every path re-checks its preconditions.
    pub fn handle_timer(&mut self, id: TimerId) {
        match id {
            TimerId::Start => self.begin_connection(),
            TimerId::Retry => self.attempt_connect(),
        }
    }

    /// Whether the platform currently reports an established connection.
    pub fn is_connected(&self) -> bool {
        self.radio.is_connected()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether loss of connection will schedule a retry.
    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Set the SSID and secret. Meant for profiles created without
    /// credentials; validation problems are logged, not enforced, since the
    /// driver is the final authority.
    pub fn set_credentials(&mut self, ssid: impl Into<String>, secret: impl Into<String>) {
        self.profile.ssid = Some(ssid.into());
        self.profile.secret = Some(secret.into());
        if let Err(err) = self.profile.validate() {
            warn!("wifi: credentials look invalid: {}", err);
        }
    }

    /// Set the hostname applied at the start of the next attempt.
    pub fn set_hostname(&mut self, hostname: impl Into<String>) {
        self.profile.hostname = Some(hostname.into());
    }

    /// Control whether loss of connection triggers an automatic new attempt.
    pub fn set_auto_reconnect(&mut self, auto_reconnect: bool) {
        self.auto_reconnect = auto_reconnect;
    }

    /// Register the connection-established notification, replacing any
    /// previous one.
    pub fn on_connection_established(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_connected = Some(Box::new(callback));
    }

    /// Register the connection-lost notification, replacing any previous one.
    pub fn on_connection_lost(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_disconnected = Some(Box::new(callback));
    }

    /// Enable chatty per-transition diagnostics at `info` level.
    pub fn enable_verbose_logging(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// The connection profile currently in effect.
    pub fn profile(&self) -> &StationProfile {
        &self.profile
    }

    /// Borrow the underlying radio driver.
    pub fn radio(&self) -> &R {
        &self.radio
    }

    #[cfg(test)]
    fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    #[cfg(test)]
    fn timers(&self) -> &T {
        &self.timers
    }

    #[cfg(test)]
    fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    /// Reset the radio and arm the retry timer. Every pending-retry
    /// transition goes through here.
    fn schedule_attempt(&mut self) {
        self.reset();

        // Stop both timers before arming one; at most one is ever live.
        self.disarm_all();
        self.timers.arm(TimerId::Retry, RETRY_DELAY);
        self.transition(LinkState::AwaitingRetryDelay);
    }

    /// Fired by the retry timer. Re-checks preconditions because something
    /// else may have connected while the timer was pending.
    fn attempt_connect(&mut self) {
        if !self.can_attempt() {
            return;
        }

        let Some(ssid) = self.profile.ssid.as_deref() else {
            return;
        };
        let secret = self.profile.secret.as_deref().filter(|s| !s.is_empty());

        if self.verbose {
            info!("wifi: connecting to {}", ssid);
        }

        // Fire-and-forget: the outcome arrives later as a radio event.
        self.radio.connect(ssid, secret);
        self.transition(LinkState::Connecting);
    }

    fn on_associated(&mut self) {
        if self.verbose {
            info!("wifi: connected");
        }

        self.transition(LinkState::Connected);

        if let Some(callback) = self.on_connected.as_mut() {
            callback();
        }
    }

    fn on_disassociated(&mut self) {
        if self.verbose {
            info!("wifi: lost connection");
        }

        if self.auto_reconnect {
            self.schedule_attempt();
        } else {
            self.transition(LinkState::Idle);
        }

        if let Some(callback) = self.on_disconnected.as_mut() {
            callback();
        }
    }

    /// Tear down any association and clear driver-cached settings so the next
    /// attempt starts clean. Station mode is forced on for the teardown and
    /// the original mode bits are restored afterwards, so a concurrently
    /// running access point is not disturbed.
    fn reset(&mut self) {
        let mode = self.radio.mode();
        if !mode.station {
            self.radio.set_mode(mode.union(RadioMode::STATION));
        }
        self.radio.disconnect(true, true);
        if !mode.station {
            self.radio.set_mode(mode);
        }
    }

    fn can_attempt(&self) -> bool {
        if !self.profile.is_configured() {
            if self.verbose {
                info!("wifi: can't start a connection: no SSID configured");
            }
            return false;
        }
        if self.radio.is_connected() {
            if self.verbose {
                info!("wifi: can't start a connection: already connected");
            }
            return false;
        }
        true
    }

    fn disarm_all(&mut self) {
        self.timers.disarm(TimerId::Start);
        self.timers.disarm(TimerId::Retry);
    }

    /// Single funnel for state changes.
    fn transition(&mut self, next: LinkState) {
        if self.state == next {
            return;
        }
        debug!("wifi: state {} -> {}", self.state, next);
        self.state = next;
    }
}

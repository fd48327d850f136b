//! Platform collaborator contracts.
//!
//! The supervisor core never talks to ESP-IDF directly. It drives a radio and
//! a pair of one-shot timers through the traits in this module, and the
//! platform layer feeds radio events and timer expiries back in through
//! [`WifiSupervisor::handle_event`] and [`WifiSupervisor::handle_timer`].
//! Nothing here holds a reference back into the supervisor, so the core can
//! be exercised on the host with plain test doubles.
//!
//! The ESP-IDF implementations live in [`esp`] (feature `esp32`).
//!
//! [`WifiSupervisor::handle_event`]: crate::supervisor::WifiSupervisor::handle_event
//! [`WifiSupervisor::handle_timer`]: crate::supervisor::WifiSupervisor::handle_timer

use std::fmt;
use std::time::Duration;

#[cfg(feature = "esp32")]
pub mod esp;

/// Radio operating mode as a pair of mode bits.
///
/// The driver may run station and access-point mode simultaneously. The
/// supervisor only ever forces the station bit on and restores the original
/// bits afterwards, so a concurrently used AP is not disturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadioMode {
    /// Client joining an existing network.
    pub station: bool,
    /// Hosting a network.
    pub access_point: bool,
}

impl RadioMode {
    /// Station-only mode.
    pub const STATION: Self = Self {
        station: true,
        access_point: false,
    };

    /// Radio fully off.
    pub const OFF: Self = Self {
        station: false,
        access_point: false,
    };

    /// Combine the mode bits of two modes.
    pub fn union(self, other: Self) -> Self {
        Self {
            station: self.station || other.station,
            access_point: self.access_point || other.access_point,
        }
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.station, self.access_point) {
            (true, true) => write!(f, "sta+ap"),
            (true, false) => write!(f, "sta"),
            (false, true) => write!(f, "ap"),
            (false, false) => write!(f, "off"),
        }
    }
}

/// Asynchronous radio notification, delivered by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    /// The station joined a network (on ESP32: got an IP lease).
    Associated,
    /// The station lost its network.
    Disassociated,
}

/// Identifies one of the two one-shot timers the supervisor owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// Initial settle delay after construction, before the first attempt.
    Start,
    /// Debounce delay between a reset and the next connect request.
    Retry,
}

/// Station-mode radio driver.
///
/// Connect and disconnect are fire-and-forget: implementations report
/// failures through logging and the eventual [`RadioEvent`] stream, never
/// through return values. This mirrors how the underlying drivers behave —
/// a connect request that goes out successfully can still fail to associate.
pub trait RadioDriver {
    /// Whether the platform currently reports an established connection.
    fn is_connected(&self) -> bool;

    /// Issue a connect request. `secret` is `None` for open networks.
    fn connect(&mut self, ssid: &str, secret: Option<&str>);

    /// Tear down any association. `forget_settings` clears driver-cached
    /// credentials so the next attempt starts clean; `preserve_mode` keeps
    /// the radio powered and in its current mode.
    fn disconnect(&mut self, forget_settings: bool, preserve_mode: bool);

    /// Current mode bits.
    fn mode(&self) -> RadioMode;

    /// Change the mode bits.
    fn set_mode(&mut self, mode: RadioMode);

    /// Apply a device hostname for the next DHCP exchange.
    fn set_hostname(&mut self, name: &str);
}

/// Two one-shot delayed-invocation handles.
///
/// Arming an already-armed timer restarts it. Disarming guarantees the
/// pending callback will not fire. Expiry is delivered to the supervisor by
/// the platform layer as a [`TimerId`].
pub trait TimerControl {
    /// Arm a timer to fire once after `delay`.
    fn arm(&mut self, id: TimerId, delay: Duration);

    /// Cancel a timer if armed; no-op otherwise.
    fn disarm(&mut self, id: TimerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_union() {
        let ap = RadioMode {
            station: false,
            access_point: true,
        };
        let both = ap.union(RadioMode::STATION);
        assert!(both.station);
        assert!(both.access_point);
    }

    #[test]
    fn test_mode_union_identity() {
        assert_eq!(RadioMode::STATION.union(RadioMode::OFF), RadioMode::STATION);
        assert_eq!(RadioMode::OFF.union(RadioMode::OFF), RadioMode::OFF);
    }

    #[test]
    fn test_mode_default_is_off() {
        assert_eq!(RadioMode::default(), RadioMode::OFF);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(RadioMode::STATION.to_string(), "sta");
        assert_eq!(RadioMode::OFF.to_string(), "off");
        let both = RadioMode {
            station: true,
            access_point: true,
        };
        assert_eq!(both.to_string(), "sta+ap");
    }
}

//! Station connection settings.
//!
//! This module contains the platform-independent credential/hostname holder
//! used by the supervisor. Everything here is host-testable.
//!
//! # Example
//!
//! ```
//! use wifi_keeper_esp32::StationProfile;
//!
//! let profile = StationProfile::new("MyNetwork", "MyPassword");
//! assert!(profile.is_configured());
//! assert!(!profile.is_open());
//! assert!(profile.validate().is_ok());
//! ```

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_SECRET_LEN: usize = 64;

/// Minimum password length for WPA2.
pub const MIN_SECRET_LEN: usize = 8;

/// Connection settings for joining an access point in station mode.
///
/// All fields are optional: a profile with no SSID is simply "not configured"
/// and the supervisor will refuse to start an attempt until one is set. An
/// absent or empty secret means an open network.
///
/// The secret is wiped from memory when the profile is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct StationProfile {
    /// Network SSID. Absent or empty means not configured.
    pub ssid: Option<String>,
    /// Pre-shared key. Absent or empty means open network.
    pub secret: Option<String>,
    /// Device hostname, applied to the driver at the start of an attempt.
    #[zeroize(skip)]
    pub hostname: Option<String>,
    /// Whether constructing a supervisor with this profile schedules the
    /// first connection attempt automatically.
    #[zeroize(skip)]
    pub auto_connect: bool,
}

impl Default for StationProfile {
    fn default() -> Self {
        Self::empty()
    }
}

impl StationProfile {
    /// Create a profile for a protected network.
    pub fn new(ssid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            ssid: Some(ssid.into()),
            secret: Some(secret.into()),
            hostname: None,
            auto_connect: true,
        }
    }

    /// Create a profile for an open network (no secret).
    pub fn open(ssid: impl Into<String>) -> Self {
        Self {
            ssid: Some(ssid.into()),
            secret: None,
            hostname: None,
            auto_connect: true,
        }
    }

    /// Create an unconfigured profile. Credentials can be supplied later via
    /// the supervisor setters; automatic connection is off since there is
    /// nothing to connect to yet.
    pub fn empty() -> Self {
        Self {
            ssid: None,
            secret: None,
            hostname: None,
            auto_connect: false,
        }
    }

    /// Set the hostname, builder-style.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the auto-connect flag, builder-style.
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Check whether an SSID is present and non-empty.
    pub fn is_configured(&self) -> bool {
        self.ssid.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Check whether this profile targets an open network.
    pub fn is_open(&self) -> bool {
        self.secret.as_deref().is_none_or(str::is_empty)
    }

    /// Validate the profile against IEEE 802.11 / WPA2 limits.
    ///
    /// Validation is advisory: the supervisor stores whatever it is given and
    /// only refuses attempts on a missing SSID, but callers that want early
    /// feedback can check here before handing the profile over.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let ssid = self.ssid.as_deref().unwrap_or("");
        if ssid.is_empty() {
            return Err(ProfileError::SsidMissing);
        }
        if ssid.len() > MAX_SSID_LEN {
            return Err(ProfileError::SsidTooLong {
                len: ssid.len(),
                max: MAX_SSID_LEN,
            });
        }

        // Empty secret is OK for open networks
        let secret = self.secret.as_deref().unwrap_or("");
        if !secret.is_empty() && secret.len() < MIN_SECRET_LEN {
            return Err(ProfileError::SecretTooShort {
                len: secret.len(),
                min: MIN_SECRET_LEN,
            });
        }
        if secret.len() > MAX_SECRET_LEN {
            return Err(ProfileError::SecretTooLong {
                len: secret.len(),
                max: MAX_SECRET_LEN,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during profile validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// SSID is absent or empty.
    SsidMissing,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Secret is too short for WPA2.
    SecretTooShort { len: usize, min: usize },
    /// Secret exceeds maximum length.
    SecretTooLong { len: usize, max: usize },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidMissing => write!(f, "SSID is not set"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::SecretTooShort { len, min } => {
                write!(f, "secret too short: {} bytes (min {})", len, min)
            }
            Self::SecretTooLong { len, max } => {
                write!(f, "secret too long: {} bytes (max {})", len, max)
            }
        }
    }
}

impl std::error::Error for ProfileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_profile() {
        let profile = StationProfile::new("TestNetwork", "password123");
        assert!(profile.is_configured());
        assert!(!profile.is_open());
        assert!(profile.auto_connect);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_open_profile() {
        let profile = StationProfile::open("OpenNetwork");
        assert!(profile.is_configured());
        assert!(profile.is_open());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_is_open() {
        let profile = StationProfile::new("TestNetwork", "");
        assert!(profile.is_open());
    }

    #[test]
    fn test_empty_profile_unconfigured() {
        let profile = StationProfile::empty();
        assert!(!profile.is_configured());
        assert!(!profile.auto_connect);
        assert_eq!(profile.validate(), Err(ProfileError::SsidMissing));
    }

    #[test]
    fn test_empty_ssid_unconfigured() {
        let mut profile = StationProfile::open("Net");
        profile.ssid = Some(String::new());
        assert!(!profile.is_configured());
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(StationProfile::default(), StationProfile::empty());
    }

    #[test]
    fn test_with_hostname() {
        let profile = StationProfile::new("Net", "password123").with_hostname("sensor-1");
        assert_eq!(profile.hostname.as_deref(), Some("sensor-1"));
    }

    #[test]
    fn test_with_auto_connect() {
        let profile = StationProfile::new("Net", "password123").with_auto_connect(false);
        assert!(!profile.auto_connect);
    }

    #[test]
    fn test_ssid_max_length() {
        let profile = StationProfile::open("a".repeat(32));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_ssid_too_long() {
        let profile = StationProfile::open("a".repeat(33));
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::SsidTooLong { .. })
        ));
    }

    #[test]
    fn test_secret_too_short() {
        let profile = StationProfile::new("Net", "short");
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::SecretTooShort { .. })
        ));
    }

    #[test]
    fn test_secret_bounds() {
        assert!(StationProfile::new("Net", "a".repeat(8)).validate().is_ok());
        assert!(StationProfile::new("Net", "a".repeat(64))
            .validate()
            .is_ok());
        assert!(matches!(
            StationProfile::new("Net", "a".repeat(65)).validate(),
            Err(ProfileError::SecretTooLong { .. })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = StationProfile::new("Net", "abc").validate().unwrap_err();
        assert_eq!(err.to_string(), "secret too short: 3 bytes (min 8)");
    }
}

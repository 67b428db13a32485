//! Constants for station-mode radio values and manager defaults.
//!
//! The numeric codes mirror the values commonly reported by embedded Wi-Fi
//! stacks for authentication modes and disconnect reasons.

/// Length limits for credentials, in bytes.
pub mod limits {
    /// Longest SSID accepted by the registry (one byte short of the 32-byte
    /// radio field, which keeps room for a terminator on C drivers).
    pub const SSID_MAX_LEN: usize = 31;
    /// Longest passphrase accepted by the registry.
    pub const PASSWORD_MAX_LEN: usize = 63;
    /// Default number of candidate access points the registry will hold.
    pub const DEFAULT_REGISTRY_CAPACITY: usize = 32;
    /// Default depth of the radio event channel.
    pub const DEFAULT_EVENT_QUEUE_DEPTH: usize = 16;
}

/// Authentication mode codes as reported in scan records.
pub mod auth_mode {
    pub const OPEN: u8 = 0;
    pub const WEP: u8 = 1;
    pub const WPA_PSK: u8 = 2;
    pub const WPA2_PSK: u8 = 3;
    pub const WPA_WPA2_PSK: u8 = 4;
    pub const WPA2_ENTERPRISE: u8 = 5;
    pub const WPA3_PSK: u8 = 6;
    pub const WPA2_WPA3_PSK: u8 = 7;
}

/// Station disconnect reason codes.
pub mod reason {
    pub const UNSPECIFIED: u16 = 1;
    pub const AUTH_EXPIRE: u16 = 2;
    pub const AUTH_LEAVE: u16 = 3;
    pub const ASSOC_EXPIRE: u16 = 4;
    pub const ASSOC_LEAVE: u16 = 8;
    pub const FOUR_WAY_HANDSHAKE_TIMEOUT: u16 = 15;
    pub const BEACON_TIMEOUT: u16 = 200;
    pub const NO_AP_FOUND: u16 = 201;
    pub const AUTH_FAIL: u16 = 202;
    pub const ASSOC_FAIL: u16 = 203;
    pub const HANDSHAKE_TIMEOUT: u16 = 204;
    pub const CONNECTION_FAIL: u16 = 205;
}

/// Scoring weights used by the default selection policy.
pub mod scoring {
    /// Each successful connection adds this much to an access point's score.
    pub const SUCCESS_WEIGHT: i64 = 2;
    /// Each failed connection subtracts this much.
    pub const FAIL_WEIGHT: i64 = 1;
}

/// Default cadences and timeouts.
///
/// The loops never block on a lock longer than [`lock_timeout`]; a tick that
/// cannot get its lock is skipped and retried on the next one.
pub mod timeouts {
    use std::time::Duration;

    /// Delay between scan coordinator ticks (500 ms).
    const SCAN_INTERVAL_MS: u64 = 500;

    /// Delay between connector ticks (1 second).
    const CONNECT_INTERVAL_MS: u64 = 1000;

    /// Bounded wait for the registry or scan lock (1 second).
    const LOCK_TIMEOUT_MS: u64 = 1000;

    /// Age after which a scan observation no longer qualifies an access
    /// point for selection (20 seconds).
    const STALE_AFTER_SECS: u64 = 20;

    /// Age after which an in-flight scan is presumed lost (10 seconds).
    const SCAN_STALL_SECS: u64 = 10;

    /// Active scan dwell time per channel, lower bound.
    const ACTIVE_DWELL_MIN_MS: u64 = 80;

    /// Active scan dwell time per channel, upper bound.
    const ACTIVE_DWELL_MAX_MS: u64 = 120;

    /// Returns the scan coordinator cadence.
    pub fn scan_interval() -> Duration {
        Duration::from_millis(SCAN_INTERVAL_MS)
    }

    /// Returns the connector cadence.
    pub fn connect_interval() -> Duration {
        Duration::from_millis(CONNECT_INTERVAL_MS)
    }

    /// Returns the bounded lock wait.
    pub fn lock_timeout() -> Duration {
        Duration::from_millis(LOCK_TIMEOUT_MS)
    }

    /// Returns the default staleness threshold.
    pub fn stale_after() -> Duration {
        Duration::from_secs(STALE_AFTER_SECS)
    }

    /// Returns the default in-flight scan stall timeout.
    pub fn scan_stall() -> Duration {
        Duration::from_secs(SCAN_STALL_SECS)
    }

    pub fn active_dwell_min() -> Duration {
        Duration::from_millis(ACTIVE_DWELL_MIN_MS)
    }

    pub fn active_dwell_max() -> Duration {
        Duration::from_millis(ACTIVE_DWELL_MAX_MS)
    }
}

/// Regulatory defaults handed to the radio at station start.
pub mod country {
    pub const CODE: &str = "US";
    pub const FIRST_CHANNEL: u8 = 1;
    pub const CHANNEL_COUNT: u8 = 11;
}

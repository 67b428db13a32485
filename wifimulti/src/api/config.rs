//! Manager configuration.

use std::time::Duration;

use crate::api::models::{ScanConfig, StationConfig};
use crate::types::constants::{limits, timeouts};

/// When a connection counts as a success for scoring.
///
/// Associating with an access point does not guarantee a usable link: DHCP
/// can still fail afterwards. Crediting at IP acquisition gives the scorer
/// a stronger signal and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessPolicy {
    /// Credit the access point as soon as the link is associated.
    AtLink,
    /// Credit the access point once an IP address is obtained.
    #[default]
    AtIpAcquired,
}

/// Tunables for [`WifiMulti`](crate::WifiMulti).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use wifimulti::{SuccessPolicy, WifiMultiConfig};
///
/// let config = WifiMultiConfig::new()
///     .with_scan_interval(Duration::from_secs(2))
///     .with_stale_after(Duration::from_secs(60))
///     .with_success_policy(SuccessPolicy::AtLink);
///
/// assert_eq!(config.scan_interval, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct WifiMultiConfig {
    /// Delay between scan coordinator ticks.
    pub scan_interval: Duration,
    /// Delay between connector ticks.
    pub connect_interval: Duration,
    /// Longest wait for the registry or scan lock.
    pub lock_timeout: Duration,
    /// Observations older than this disqualify an access point.
    pub stale_after: Duration,
    /// An in-flight scan older than this is presumed lost.
    pub scan_stall_timeout: Duration,
    /// Maximum number of registered access points.
    pub max_access_points: usize,
    /// Capacity of the radio event channel.
    pub event_queue_depth: usize,
    pub success_policy: SuccessPolicy,
    pub scan: ScanConfig,
    pub station: StationConfig,
}

impl Default for WifiMultiConfig {
    fn default() -> Self {
        Self {
            scan_interval: timeouts::scan_interval(),
            connect_interval: timeouts::connect_interval(),
            lock_timeout: timeouts::lock_timeout(),
            stale_after: timeouts::stale_after(),
            scan_stall_timeout: timeouts::scan_stall(),
            max_access_points: limits::DEFAULT_REGISTRY_CAPACITY,
            event_queue_depth: limits::DEFAULT_EVENT_QUEUE_DEPTH,
            success_policy: SuccessPolicy::default(),
            scan: ScanConfig::default(),
            station: StationConfig::default(),
        }
    }
}

impl WifiMultiConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    #[must_use]
    pub fn with_connect_interval(mut self, interval: Duration) -> Self {
        self.connect_interval = interval;
        self
    }

    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }

    #[must_use]
    pub fn with_scan_stall_timeout(mut self, timeout: Duration) -> Self {
        self.scan_stall_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_access_points(mut self, max: usize) -> Self {
        self.max_access_points = max;
        self
    }

    /// Sets the event channel capacity; zero is raised to one.
    #[must_use]
    pub fn with_event_queue_depth(mut self, depth: usize) -> Self {
        self.event_queue_depth = depth.max(1);
        self
    }

    #[must_use]
    pub fn with_success_policy(mut self, policy: SuccessPolicy) -> Self {
        self.success_policy = policy;
        self
    }

    #[must_use]
    pub fn with_scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    #[must_use]
    pub fn with_station_config(mut self, station: StationConfig) -> Self {
        self.station = station;
        self
    }
}

use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

use crate::types::constants::{auth_mode, country, limits, reason, timeouts};

/// Network name of an access point.
///
/// Holds the raw SSID bytes (1 to 31 bytes). SSIDs are not required to be
/// valid UTF-8; [`Display`] renders them lossily.
///
/// # Examples
///
/// ```rust
/// use wifimulti::Ssid;
///
/// let ssid = Ssid::try_from("HomeNetwork").unwrap();
/// assert_eq!(ssid.as_bytes(), b"HomeNetwork");
/// assert!(Ssid::try_from("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ssid(Vec<u8>);

impl Ssid {
    /// Validates and wraps raw SSID bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WifiMultiError::InvalidSsid`] when the SSID is empty or
    /// longer than 31 bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, WifiMultiError> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > limits::SSID_MAX_LEN {
            return Err(WifiMultiError::InvalidSsid { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an `Ssid` cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&str> for Ssid {
    type Error = WifiMultiError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.as_bytes())
    }
}

impl TryFrom<&[u8]> for Ssid {
    type Error = WifiMultiError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Borrow<[u8]> for Ssid {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Ssid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for Ssid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Pre-shared key for an access point (0 to 63 bytes).
///
/// An empty passphrase is only useful for open networks. The contents never
/// show up in `Debug` output or serialized snapshots.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Passphrase(Vec<u8>);

impl Passphrase {
    /// Validates and wraps raw passphrase bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WifiMultiError::InvalidPassword`] when longer than 63 bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, WifiMultiError> {
        let bytes = bytes.into();
        if bytes.len() > limits::PASSWORD_MAX_LEN {
            return Err(WifiMultiError::InvalidPassword { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "Passphrase(<empty>)")
        } else {
            write!(f, "Passphrase(<redacted>)")
        }
    }
}

/// Authentication scheme advertised by an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AuthMode {
    /// No encryption.
    Open,
    /// Legacy WEP.
    Wep,
    /// WPA Personal.
    WpaPsk,
    /// WPA2 Personal.
    Wpa2Psk,
    /// Mixed WPA/WPA2 Personal.
    WpaWpa2Psk,
    /// WPA2 Enterprise (802.1X).
    Wpa2Enterprise,
    /// WPA3 Personal (SAE).
    Wpa3Psk,
    /// Mixed WPA2/WPA3 Personal.
    Wpa2Wpa3Psk,
    /// Not observed yet, or a mode the radio reported that we do not know.
    #[default]
    Unknown,
}

impl AuthMode {
    /// Returns `true` for anything other than an open network.
    ///
    /// `Unknown` counts as encrypted so that an access point is never
    /// joined without a passphrase before its mode has been observed.
    #[must_use]
    pub fn is_encrypted(self) -> bool {
        self != AuthMode::Open
    }
}

impl From<u8> for AuthMode {
    fn from(code: u8) -> Self {
        match code {
            auth_mode::OPEN => Self::Open,
            auth_mode::WEP => Self::Wep,
            auth_mode::WPA_PSK => Self::WpaPsk,
            auth_mode::WPA2_PSK => Self::Wpa2Psk,
            auth_mode::WPA_WPA2_PSK => Self::WpaWpa2Psk,
            auth_mode::WPA2_ENTERPRISE => Self::Wpa2Enterprise,
            auth_mode::WPA3_PSK => Self::Wpa3Psk,
            auth_mode::WPA2_WPA3_PSK => Self::Wpa2Wpa3Psk,
            _ => Self::Unknown,
        }
    }
}

impl Display for AuthMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Open => write!(f, "Open"),
            AuthMode::Wep => write!(f, "WEP"),
            AuthMode::WpaPsk => write!(f, "WPA-PSK"),
            AuthMode::Wpa2Psk => write!(f, "WPA2-PSK"),
            AuthMode::WpaWpa2Psk => write!(f, "WPA/WPA2-PSK"),
            AuthMode::Wpa2Enterprise => write!(f, "WPA2-Enterprise"),
            AuthMode::Wpa3Psk => write!(f, "WPA3-PSK"),
            AuthMode::Wpa2Wpa3Psk => write!(f, "WPA2/WPA3-PSK"),
            AuthMode::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Monotonic time since boot, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Returns this timestamp moved forward by `d`.
    #[must_use]
    pub fn saturating_add(self, d: Duration) -> Self {
        let micros = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

/// Reason the radio gave for dropping or refusing a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DisconnectReason {
    Unspecified,
    AuthExpired,
    AuthLeave,
    AssocExpired,
    AssocLeave,
    FourWayHandshakeTimeout,
    BeaconTimeout,
    NoApFound,
    AuthFail,
    AssocFail,
    HandshakeTimeout,
    ConnectionFail,
    /// Any code without a named variant.
    Other(u16),
}

impl DisconnectReason {
    /// Returns the raw reason code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Unspecified => reason::UNSPECIFIED,
            Self::AuthExpired => reason::AUTH_EXPIRE,
            Self::AuthLeave => reason::AUTH_LEAVE,
            Self::AssocExpired => reason::ASSOC_EXPIRE,
            Self::AssocLeave => reason::ASSOC_LEAVE,
            Self::FourWayHandshakeTimeout => reason::FOUR_WAY_HANDSHAKE_TIMEOUT,
            Self::BeaconTimeout => reason::BEACON_TIMEOUT,
            Self::NoApFound => reason::NO_AP_FOUND,
            Self::AuthFail => reason::AUTH_FAIL,
            Self::AssocFail => reason::ASSOC_FAIL,
            Self::HandshakeTimeout => reason::HANDSHAKE_TIMEOUT,
            Self::ConnectionFail => reason::CONNECTION_FAIL,
            Self::Other(code) => code,
        }
    }

    /// Returns `true` when the failure most likely means bad credentials.
    ///
    /// A wrong passphrase usually surfaces as a handshake timeout rather
    /// than an explicit auth failure.
    #[must_use]
    pub fn is_auth_failure(self) -> bool {
        matches!(
            self,
            Self::AuthFail | Self::FourWayHandshakeTimeout | Self::HandshakeTimeout
        )
    }
}

impl From<u16> for DisconnectReason {
    fn from(code: u16) -> Self {
        match code {
            reason::UNSPECIFIED => Self::Unspecified,
            reason::AUTH_EXPIRE => Self::AuthExpired,
            reason::AUTH_LEAVE => Self::AuthLeave,
            reason::ASSOC_EXPIRE => Self::AssocExpired,
            reason::ASSOC_LEAVE => Self::AssocLeave,
            reason::FOUR_WAY_HANDSHAKE_TIMEOUT => Self::FourWayHandshakeTimeout,
            reason::BEACON_TIMEOUT => Self::BeaconTimeout,
            reason::NO_AP_FOUND => Self::NoApFound,
            reason::AUTH_FAIL => Self::AuthFail,
            reason::ASSOC_FAIL => Self::AssocFail,
            reason::HANDSHAKE_TIMEOUT => Self::HandshakeTimeout,
            reason::CONNECTION_FAIL => Self::ConnectionFail,
            other => Self::Other(other),
        }
    }
}

impl Display for DisconnectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified"),
            Self::AuthExpired => write!(f, "authentication expired"),
            Self::AuthLeave => write!(f, "deauthenticated by AP"),
            Self::AssocExpired => write!(f, "association expired"),
            Self::AssocLeave => write!(f, "disassociated by AP"),
            Self::FourWayHandshakeTimeout => write!(f, "4-way handshake timeout"),
            Self::BeaconTimeout => write!(f, "beacon timeout"),
            Self::NoApFound => write!(f, "no AP found"),
            Self::AuthFail => write!(f, "authentication failed"),
            Self::AssocFail => write!(f, "association failed"),
            Self::HandshakeTimeout => write!(f, "handshake timeout"),
            Self::ConnectionFail => write!(f, "connection failed"),
            Self::Other(code) => write!(f, "reason {code}"),
        }
    }
}

/// A candidate access point and what we have learned about it.
///
/// Instances are owned by the registry; the ones handed out by
/// [`WifiMulti::find`](crate::WifiMulti::find) and
/// [`WifiMulti::access_points`](crate::WifiMulti::access_points) are
/// snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct AccessPoint {
    /// Network name, unique within the registry.
    pub ssid: Ssid,
    /// Pre-shared key; empty for open networks.
    #[serde(skip)]
    pub password: Passphrase,
    /// Last advertised authentication mode, `Unknown` until scanned.
    pub auth_mode: AuthMode,
    /// Connections credited as successful.
    pub success_count: u32,
    /// Connections that ended in a disconnect.
    pub fail_count: u32,
    /// Reason attached to the most recent disconnect.
    pub last_error: Option<DisconnectReason>,
    /// Best signal strength from the most recent scan, in dBm.
    pub last_rssi: Option<i32>,
    /// When a scan last reported this SSID; `None` if never.
    pub last_seen: Option<Timestamp>,
}

impl AccessPoint {
    pub(crate) fn new(ssid: Ssid, password: Passphrase) -> Self {
        Self {
            ssid,
            password,
            auth_mode: AuthMode::Unknown,
            success_count: 0,
            fail_count: 0,
            last_error: None,
            last_rssi: None,
            last_seen: None,
        }
    }

    /// Returns `true` if the access point advertises encryption but no
    /// passphrase was registered for it.
    #[must_use]
    pub fn lacks_credentials(&self) -> bool {
        self.auth_mode.is_encrypted() && self.password.is_empty()
    }
}

/// One access point reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Raw SSID bytes; may be empty for hidden networks.
    pub ssid: Vec<u8>,
    /// Hardware address of the reporting radio.
    pub bssid: Option<[u8; 6]>,
    /// Signal strength in dBm.
    pub rssi: i32,
    pub auth_mode: AuthMode,
    /// Primary channel, 0 if unknown.
    pub channel: u8,
}

impl ScanRecord {
    pub fn new(ssid: impl Into<Vec<u8>>, rssi: i32, auth_mode: AuthMode) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: None,
            rssi,
            auth_mode,
            channel: 0,
        }
    }

    #[must_use]
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    #[must_use]
    pub fn with_bssid(mut self, bssid: [u8; 6]) -> Self {
        self.bssid = Some(bssid);
        self
    }
}

/// Outcome carried by a scan-complete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Success,
    /// The radio aborted the scan; carries the driver's status code.
    Failed(u32),
}

impl From<u32> for ScanStatus {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Success,
            other => Self::Failed(other),
        }
    }
}

/// Connectivity events raised by the radio driver.
///
/// Drivers push these through an [`EventSender`](crate::EventSender); a
/// single dispatcher task applies them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The station interface came up.
    StationStarted,
    /// Associated with an access point.
    LinkConnected { ssid: Vec<u8>, channel: u8 },
    /// The link dropped or the association attempt failed.
    LinkDisconnected {
        ssid: Vec<u8>,
        reason: DisconnectReason,
    },
    /// A scan started by the coordinator finished.
    ScanComplete { status: ScanStatus, count: u16 },
    /// DHCP handed out an address.
    IpAcquired { ip: Ipv4Addr },
    /// The address was lost.
    IpLost,
}

/// Link state shared between the scan loop, the connect loop and the
/// dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum LinkState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl From<u8> for LinkState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl Display for LinkState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// How the radio looks for the target network when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMethod {
    /// Stop at the first matching access point.
    Fast,
    /// Sweep every channel and then pick.
    #[default]
    AllChannel,
}

/// How the radio orders several access points sharing the target SSID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMethod {
    #[default]
    BySignal,
    BySecurity,
}

/// Everything the radio needs to join a selected access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectProfile {
    pub ssid: Ssid,
    pub password: Passphrase,
    /// Weakest authentication mode the radio may accept for this SSID.
    pub auth_threshold: AuthMode,
    pub scan_method: ScanMethod,
    pub sort_method: SortMethod,
}

impl ConnectProfile {
    /// Builds a profile for a registry entry.
    ///
    /// The auth threshold is the mode the access point was last seen
    /// advertising, so a spoofed open network with the same name is refused.
    pub fn for_access_point(ap: &AccessPoint) -> Self {
        Self {
            ssid: ap.ssid.clone(),
            password: ap.password.clone(),
            auth_threshold: ap.auth_mode,
            scan_method: ScanMethod::default(),
            sort_method: SortMethod::default(),
        }
    }
}

/// Scan flavour requested from the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanType {
    /// Probe each channel; faster, but generates traffic.
    Active,
    /// Listen for beacons only.
    #[default]
    Passive,
}

/// Parameters for one scan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub scan_type: ScanType,
    /// Report networks that hide their SSID.
    pub show_hidden: bool,
    /// Restrict the scan to one channel; `None` sweeps all channels.
    pub channel: Option<u8>,
    /// Per-channel dwell bounds, only used by active scans.
    pub active_dwell_min: Duration,
    pub active_dwell_max: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_type: ScanType::Passive,
            show_hidden: true,
            channel: None,
            active_dwell_min: timeouts::active_dwell_min(),
            active_dwell_max: timeouts::active_dwell_max(),
        }
    }
}

/// Radio power save mode while associated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerSave {
    /// Keep the radio awake; lowest latency.
    #[default]
    None,
    /// Wake every DTIM period.
    MinModem,
    /// Wake at the listen interval.
    MaxModem,
}

/// Regulatory domain for the station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryConfig {
    pub code: String,
    pub first_channel: u8,
    pub channel_count: u8,
}

impl Default for CountryConfig {
    fn default() -> Self {
        Self {
            code: country::CODE.to_string(),
            first_channel: country::FIRST_CHANNEL,
            channel_count: country::CHANNEL_COUNT,
        }
    }
}

/// Settings applied when the station role is brought up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StationConfig {
    pub country: CountryConfig,
    pub power_save: PowerSave,
}

/// Errors returned by the manager and by radio drivers.
///
/// Only the public entry points return these; the background loops log
/// them and retry on their next tick.
///
/// # Examples
///
/// ```rust
/// use wifimulti::WifiMultiError;
///
/// let err = WifiMultiError::InvalidSsid { len: 0 };
/// assert_eq!(err.to_string(), "invalid SSID length: 0 bytes (expected 1-31)");
/// ```
#[derive(Debug, Error)]
pub enum WifiMultiError {
    /// SSID empty or longer than 31 bytes.
    #[error("invalid SSID length: {len} bytes (expected 1-31)")]
    InvalidSsid { len: usize },

    /// Passphrase longer than 63 bytes.
    #[error("invalid password length: {len} bytes (expected at most 63)")]
    InvalidPassword { len: usize },

    /// The SSID is already registered.
    #[error("access point already registered: {0}")]
    DuplicateSsid(String),

    /// The registry is at capacity.
    #[error("access point registry is full ({capacity} entries)")]
    RegistryFull { capacity: usize },

    /// A lock could not be acquired in time.
    #[error("timed out waiting for {0} lock")]
    LockTimeout(&'static str),

    /// The radio driver rejected a request.
    #[error("radio driver error {code}: {message}")]
    Driver { code: i32, message: String },

    /// The event channel has no free slot.
    #[error("radio event queue is full")]
    EventQueueFull,

    /// The dispatcher is gone.
    #[error("radio event queue is closed")]
    EventQueueClosed,

    /// `start` was called on a manager that is already running.
    #[error("manager already started")]
    AlreadyStarted,
}

impl WifiMultiError {
    /// Convenience constructor for driver implementations.
    pub fn driver(code: i32, message: impl Into<String>) -> Self {
        Self::Driver {
            code,
            message: message.into(),
        }
    }
}

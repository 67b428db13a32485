//! Keeps a Wi-Fi station connected to the best of several known access
//! points.
//!
//! This crate provides an async manager for devices that must stay online
//! without an operator:
//!
//! - Registering candidate networks with optional passwords
//! - Periodic passive scanning while the link is down
//! - Per-network success/failure history and signal tracking
//! - Automatic selection of the most reliable visible network
//! - Reconnecting after the link drops
//!
//! The radio itself is abstracted behind the [`Radio`] trait. A driver
//! accepts requests (scan, fetch results, connect) and reports outcomes as
//! [`RadioEvent`]s through the [`EventSender`] it is handed at start-up.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wifimulti::{Radio, WifiMulti, WifiMultiConfig};
//!
//! # async fn example(radio: Arc<dyn Radio>) -> wifimulti::Result<()> {
//! let wifi = WifiMulti::new(radio, WifiMultiConfig::default());
//!
//! wifi.add_access_point("HomeNetwork", Some("password123")).await?;
//! wifi.add_access_point("Workshop", Some("hunter22")).await?;
//! wifi.add_access_point("CoffeeShop", None).await?;
//!
//! wifi.start().await?;
//!
//! for ap in wifi.access_points().await? {
//!     println!("{}: +{} -{}", ap.ssid, ap.success_count, ap.fail_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Selection
//!
//! Every candidate scores `2 * successes - failures`. Among networks seen by
//! a recent scan, the highest score wins and the stronger signal breaks a
//! tie. Encrypted networks registered without a password are skipped. The
//! weights and the staleness window can be replaced with a custom
//! [`SelectionPolicy`].
//!
//! # Error Handling
//!
//! Public operations return [`Result<T>`] with a [`WifiMultiError`]. The
//! background tasks never fail: they log problems and retry on their next
//! tick.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod types;
mod util;

// Public API modules
pub mod api;

// Re-exported public API
pub use api::config::{SuccessPolicy, WifiMultiConfig};
pub use api::models::{
    AccessPoint, AuthMode, ConnectProfile, CountryConfig, DisconnectReason, LinkState,
    Passphrase, PowerSave, RadioEvent, ScanConfig, ScanMethod, ScanRecord, ScanStatus, ScanType,
    SortMethod, Ssid, StationConfig, Timestamp, WifiMultiError,
};
pub use api::radio::{EventSender, Radio};
pub use api::wifi_multi::WifiMulti;
pub use crate::core::selection::{ScorePolicy, SelectionPolicy};
pub use util::clock::{Clock, ManualClock, MonotonicClock};

/// A specialized `Result` type for manager operations.
pub type Result<T> = std::result::Result<T, WifiMultiError>;

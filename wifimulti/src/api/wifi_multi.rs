use log::{LevelFilter, debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::Result;
use crate::api::config::WifiMultiConfig;
use crate::api::models::{AccessPoint, LinkState, RadioEvent, WifiMultiError};
use crate::api::radio::{EventSender, Radio};
use crate::core::connector::Connector;
use crate::core::dispatcher::EventDispatcher;
use crate::core::registry::ApRegistry;
use crate::core::scan::ScanCoordinator;
use crate::core::selection::{ScorePolicy, SelectionPolicy};
use crate::core::state::SharedState;
use crate::util::clock::{Clock, MonotonicClock};

/// Keeps a station connected to the best of several known access points.
///
/// This is the main entry point of the crate. Register candidate networks
/// with [`add_access_point`](Self::add_access_point), then call
/// [`start`](Self::start). From then on three background tasks run:
///
/// - a scan loop that asks the radio for a passive scan whenever the link
///   is down,
/// - an event dispatcher that folds scan results and link events into
///   per-network statistics,
/// - a connect loop that picks the highest-scoring visible network and asks
///   the radio to join it.
///
/// A network's score is `2 * successes - failures`; ties go to the stronger
/// signal. Networks not seen by a scan within
/// [`stale_after`](WifiMultiConfig::stale_after) and encrypted networks
/// without a password are never chosen.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wifimulti::{Radio, WifiMulti, WifiMultiConfig};
///
/// # async fn example(radio: Arc<dyn Radio>) -> wifimulti::Result<()> {
/// let wifi = WifiMulti::new(radio, WifiMultiConfig::default());
/// wifi.add_access_point("HomeNetwork", Some("password123")).await?;
/// wifi.add_access_point("CoffeeShop", None).await?;
/// wifi.start().await?;
///
/// let mut link = wifi.subscribe_link();
/// while !wifi.is_connected() {
///     link.changed().await.ok();
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Lifecycle
///
/// The background tasks stop on [`shutdown`](Self::shutdown), or when the
/// `WifiMulti` is dropped. A manager cannot be started twice.
pub struct WifiMulti {
    radio: Arc<dyn Radio>,
    config: WifiMultiConfig,
    registry: Arc<ApRegistry>,
    state: Arc<SharedState>,
    scan_lock: Arc<Mutex<()>>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn SelectionPolicy>,
    events: EventSender,
    event_rx: Mutex<Option<mpsc::Receiver<RadioEvent>>>,
    started: AtomicBool,
    shutdown_tx: watch::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WifiMulti {
    /// Creates a stopped manager around `radio`.
    ///
    /// Uses a [`MonotonicClock`] and a [`ScorePolicy`] built from
    /// `config.stale_after`.
    pub fn new(radio: Arc<dyn Radio>, config: WifiMultiConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.event_queue_depth.max(1));
        let (shutdown_tx, _) = watch::channel(());
        Self {
            registry: Arc::new(ApRegistry::new(
                config.max_access_points,
                config.lock_timeout,
            )),
            state: Arc::new(SharedState::new()),
            scan_lock: Arc::new(Mutex::new(())),
            clock: Arc::new(MonotonicClock::new()),
            policy: Arc::new(ScorePolicy::new(config.stale_after)),
            events: EventSender::new(tx),
            event_rx: Mutex::new(Some(rx)),
            started: AtomicBool::new(false),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            radio,
            config,
        }
    }

    /// Replaces the time source used for scan bookkeeping and staleness.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the scoring and staleness policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a candidate network.
    ///
    /// Pass `None` (or an empty string) for open networks.
    ///
    /// # Errors
    ///
    /// - [`WifiMultiError::InvalidSsid`] unless the SSID is 1 to 31 bytes
    /// - [`WifiMultiError::InvalidPassword`] if the password exceeds 63 bytes
    /// - [`WifiMultiError::DuplicateSsid`] if the SSID is already registered
    /// - [`WifiMultiError::RegistryFull`] at `max_access_points`
    /// - [`WifiMultiError::LockTimeout`] if the registry stayed busy
    pub async fn add_access_point(&self, ssid: &str, password: Option<&str>) -> Result<()> {
        self.add_access_point_bytes(ssid.as_bytes(), password.map(str::as_bytes))
            .await
    }

    /// Like [`add_access_point`](Self::add_access_point), for SSIDs that are
    /// not valid UTF-8.
    pub async fn add_access_point_bytes(
        &self,
        ssid: &[u8],
        password: Option<&[u8]>,
    ) -> Result<()> {
        self.registry.add(ssid, password).await
    }

    /// Brings up the station and spawns the background tasks.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`WifiMultiError::AlreadyStarted`] on a second call
    /// - whatever the radio returns from `start_station`; the manager can
    ///   then be started again
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WifiMultiError::AlreadyStarted);
        }

        let mut slot = self.event_rx.lock().await;
        let Some(events) = slot.take() else {
            return Err(WifiMultiError::AlreadyStarted);
        };

        if let Err(e) = self
            .radio
            .start_station(&self.config.station, self.events.clone())
            .await
        {
            warn!("Radio failed to start station: {e}");
            *slot = Some(events);
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }
        drop(slot);

        let dispatcher = EventDispatcher::new(
            self.radio.clone(),
            self.registry.clone(),
            self.state.clone(),
            self.scan_lock.clone(),
            self.clock.clone(),
            self.config.lock_timeout,
            self.config.success_policy,
        );
        let scanner = ScanCoordinator {
            radio: self.radio.clone(),
            state: self.state.clone(),
            scan_lock: self.scan_lock.clone(),
            clock: self.clock.clone(),
            config: self.config.scan.clone(),
            lock_timeout: self.config.lock_timeout,
            stall_timeout: self.config.scan_stall_timeout,
        };
        let connector = Connector {
            radio: self.radio.clone(),
            registry: self.registry.clone(),
            state: self.state.clone(),
            clock: self.clock.clone(),
            policy: self.policy.clone(),
        };

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(
            dispatcher.run(events, self.events.overflow(), self.shutdown_tx.subscribe()),
        ));
        tasks.push(tokio::spawn(
            scanner.run(self.config.scan_interval, self.shutdown_tx.subscribe()),
        ));
        tasks.push(tokio::spawn(
            connector.run(self.config.connect_interval, self.shutdown_tx.subscribe()),
        ));

        info!(
            "Wi-Fi manager started with {} access points",
            self.registry.len().await.unwrap_or_default()
        );
        Ok(())
    }

    /// Stops the background tasks and waits for them to finish.
    ///
    /// Does nothing if the manager was never started.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).is_err() {
            debug!("No background tasks to stop");
        }
        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {e}");
            }
        }
        info!("Wi-Fi manager stopped");
    }

    /// Sets the maximum level of log records emitted process-wide.
    ///
    /// Only affects diagnostics; the manager behaves the same at any level.
    pub fn set_log_level(&self, level: LevelFilter) {
        log::set_max_level(level);
    }

    /// Returns `true` while associated with an access point.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn link_state(&self) -> LinkState {
        self.state.link()
    }

    /// Returns `true` while a scan request is in flight.
    pub fn is_scanning(&self) -> bool {
        self.state.is_scanning()
    }

    /// Connect attempts since an IP address was last obtained.
    pub fn retry_count(&self) -> u32 {
        self.state.retries()
    }

    /// Returns a receiver that observes every link state change.
    pub fn subscribe_link(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Snapshots of every registered access point, in SSID byte order.
    pub async fn access_points(&self) -> Result<Vec<AccessPoint>> {
        self.registry.snapshot().await
    }

    /// Snapshot of one registered access point.
    pub async fn find(&self, ssid: impl AsRef<[u8]>) -> Result<Option<AccessPoint>> {
        self.registry.find(ssid.as_ref()).await
    }

    /// Handle for radio drivers to deliver events.
    ///
    /// Also passed to [`Radio::start_station`].
    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    pub fn config(&self) -> &WifiMultiConfig {
        &self.config
    }
}

impl fmt::Debug for WifiMulti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiMulti")
            .field("link", &self.state.link())
            .field("scanning", &self.state.is_scanning())
            .field("started", &self.started.load(Ordering::SeqCst))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

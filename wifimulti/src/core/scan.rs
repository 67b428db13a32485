//! Periodic scanning.
//!
//! The scan coordinator owns the cadence of scan requests. Each tick takes
//! the scan lock (shared with the dispatcher's result retrieval, so a new
//! scan never starts while the previous results are being drained) and, if
//! the link is idle, asks the radio for a passive scan.
//!
//! Scanning while associated is avoided on purpose: with a single radio even
//! a background scan causes large packet delays.

use log::{debug, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};

use crate::api::models::ScanConfig;
use crate::api::radio::Radio;
use crate::core::state::SharedState;
use crate::util::clock::Clock;
use crate::util::utils::{lock_with_timeout, sleep_or_shutdown};

/// What a single coordinator tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanTick {
    /// A scan request was accepted by the radio.
    Started,
    /// The scan lock could not be taken in time.
    LockBusy,
    /// Connected or connecting; no scan wanted.
    NotIdle,
    /// A previous scan has not completed yet.
    InFlight,
    /// The radio refused the request.
    Rejected,
}

pub(crate) struct ScanCoordinator {
    pub(crate) radio: Arc<dyn Radio>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) scan_lock: Arc<Mutex<()>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: ScanConfig,
    pub(crate) lock_timeout: Duration,
    pub(crate) stall_timeout: Duration,
}

impl ScanCoordinator {
    /// Runs one coordinator step. Never fails; problems are logged and the
    /// next tick tries again.
    pub(crate) async fn tick(&self) -> ScanTick {
        let _guard = match lock_with_timeout(&self.scan_lock, self.lock_timeout, "scan").await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Skipping scan tick: {e}");
                return ScanTick::LockBusy;
            }
        };

        if !self.state.is_idle() {
            trace!("Skipping scan while {}", self.state.link());
            return ScanTick::NotIdle;
        }

        let now = self.clock.now();
        if let Some(started) = self.state.scan_started() {
            let age = now.saturating_duration_since(started);
            if age <= self.stall_timeout {
                trace!("Scan in flight for {age:?}, waiting");
                return ScanTick::InFlight;
            }
            warn!("Scan started {age:?} ago never completed, issuing a new one");
            self.release_stalled_results().await;
            self.state.end_scan();
        }

        // Flag before the request: the completion event may beat our return.
        self.state.begin_scan(now);
        match self.radio.scan_start(&self.config).await {
            Ok(()) => {
                debug!("Scan started");
                ScanTick::Started
            }
            Err(e) => {
                self.state.end_scan();
                warn!("Radio refused scan request: {e}");
                ScanTick::Rejected
            }
        }
    }

    /// Fetches and discards whatever the lost scan left in the radio, so
    /// its result buffer is freed before the next request.
    async fn release_stalled_results(&self) {
        let count = self.radio.scan_result_count().await.unwrap_or_default();
        match self.radio.scan_fetch_records(count).await {
            Ok(records) => debug!("Discarded {} records of a stalled scan", records.len()),
            Err(e) => warn!("Could not release stalled scan results: {e}"),
        }
    }

    /// Ticks every `interval` until shutdown.
    pub(crate) async fn run(self, interval: Duration, mut shutdown: watch::Receiver<()>) {
        debug!("Scan loop running every {interval:?}");
        loop {
            self.tick().await;
            if sleep_or_shutdown(interval, &mut shutdown).await {
                debug!("Scan loop stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{LinkState, Timestamp};
    use crate::core::mock::MockRadio;
    use crate::util::clock::ManualClock;
    use std::sync::atomic::Ordering;

    struct Fixture {
        radio: Arc<MockRadio>,
        state: Arc<SharedState>,
        lock: Arc<Mutex<()>>,
        clock: Arc<ManualClock>,
        coordinator: ScanCoordinator,
    }

    fn fixture() -> Fixture {
        let radio = Arc::new(MockRadio::default());
        let state = Arc::new(SharedState::new());
        let lock = Arc::new(Mutex::new(()));
        let clock = Arc::new(ManualClock::new(Timestamp::from_micros(1_000_000)));
        let coordinator = ScanCoordinator {
            radio: radio.clone(),
            state: state.clone(),
            scan_lock: lock.clone(),
            clock: clock.clone(),
            config: ScanConfig::default(),
            lock_timeout: Duration::from_secs(1),
            stall_timeout: Duration::from_secs(10),
        };
        Fixture {
            radio,
            state,
            lock,
            clock,
            coordinator,
        }
    }

    #[tokio::test]
    async fn idle_tick_starts_scan() {
        let f = fixture();
        assert_eq!(f.coordinator.tick().await, ScanTick::Started);
        assert_eq!(f.radio.scans(), 1);
        assert!(f.state.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn busy_lock_skips_without_scanning() {
        let f = fixture();
        let _held = f.lock.lock().await;
        assert_eq!(f.coordinator.tick().await, ScanTick::LockBusy);
        assert_eq!(f.radio.scans(), 0);
        assert!(!f.state.is_scanning());
    }

    #[tokio::test]
    async fn no_scan_while_connected_or_connecting() {
        let f = fixture();
        f.state.set_link(LinkState::Connected);
        assert_eq!(f.coordinator.tick().await, ScanTick::NotIdle);
        f.state.set_link(LinkState::Connecting);
        assert_eq!(f.coordinator.tick().await, ScanTick::NotIdle);
        assert_eq!(f.radio.scans(), 0);
    }

    #[tokio::test]
    async fn waits_for_in_flight_scan() {
        let f = fixture();
        assert_eq!(f.coordinator.tick().await, ScanTick::Started);
        f.clock.advance(Duration::from_millis(500));
        assert_eq!(f.coordinator.tick().await, ScanTick::InFlight);
        assert_eq!(f.radio.scans(), 1);
    }

    #[tokio::test]
    async fn stalled_scan_is_reissued() {
        let f = fixture();
        assert_eq!(f.coordinator.tick().await, ScanTick::Started);
        f.clock.advance(Duration::from_secs(11));
        assert_eq!(f.coordinator.tick().await, ScanTick::Started);
        assert_eq!(f.radio.scans(), 2);
        assert_eq!(f.radio.fetch_count(), 1);
        assert!(f.state.is_scanning());
    }

    #[tokio::test]
    async fn in_flight_scan_is_not_drained_early() {
        let f = fixture();
        assert_eq!(f.coordinator.tick().await, ScanTick::Started);
        f.clock.advance(Duration::from_secs(10));
        assert_eq!(f.coordinator.tick().await, ScanTick::InFlight);
        assert_eq!(f.radio.fetch_count(), 0);
    }

    #[tokio::test]
    async fn rejected_scan_clears_flag() {
        let f = fixture();
        f.radio.reject_scan.store(true, Ordering::SeqCst);
        assert_eq!(f.coordinator.tick().await, ScanTick::Rejected);
        assert!(!f.state.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let f = fixture();
        let radio = f.radio.clone();
        let (tx, rx) = watch::channel(());
        let task = tokio::spawn(f.coordinator.run(Duration::from_millis(500), rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        task.await.unwrap();
        assert_eq!(radio.scans(), 1);
    }
}

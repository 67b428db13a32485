//! The radio driver seam.
//!
//! The manager never talks to hardware directly. A driver implements
//! [`Radio`] for requests going down, and pushes [`RadioEvent`]s up through
//! the [`EventSender`] it receives in [`Radio::start_station`].

use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc};

use crate::Result;
use crate::api::models::{
    ConnectProfile, RadioEvent, ScanConfig, ScanRecord, ScanStatus, StationConfig,
    WifiMultiError,
};

/// Requests the manager issues to the radio driver.
///
/// All requests are fire-and-forget from the manager's point of view: an
/// `Ok` means the driver accepted the request, and the outcome arrives
/// later as an event. An `Err` means the request was refused outright.
///
/// # Scan result buffers
///
/// Most station drivers keep scan results in an internal buffer that is
/// only released when the results are read. The manager calls
/// [`scan_fetch_records`](Radio::scan_fetch_records) exactly once for every
/// successful [`RadioEvent::ScanComplete`].
#[async_trait]
pub trait Radio: Send + Sync {
    /// Brings up the station role and hands the driver its event channel.
    async fn start_station(&self, config: &StationConfig, events: EventSender) -> Result<()>;

    /// Starts an asynchronous scan. Completion is reported with
    /// [`RadioEvent::ScanComplete`].
    async fn scan_start(&self, config: &ScanConfig) -> Result<()>;

    /// Number of records held from the last completed scan.
    async fn scan_result_count(&self) -> Result<u16>;

    /// Copies up to `max` records out and releases the driver's buffer.
    async fn scan_fetch_records(&self, max: u16) -> Result<Vec<ScanRecord>>;

    /// Starts joining the access point described by `profile`. The outcome
    /// arrives as [`RadioEvent::LinkConnected`] or
    /// [`RadioEvent::LinkDisconnected`].
    async fn connect(&self, profile: &ConnectProfile) -> Result<()>;
}

/// Handle drivers use to deliver events to the dispatcher.
///
/// Backed by a bounded channel. Cloning is cheap.
///
/// A [`RadioEvent::ScanComplete`] is never lost: if the channel is full it
/// is parked in a single overflow slot the dispatcher also watches, so the
/// scan results still get fetched. Other events are refused with
/// `EventQueueFull` when the channel is full.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<RadioEvent>,
    overflow: Arc<PendingScan>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<RadioEvent>) -> Self {
        Self {
            tx,
            overflow: Arc::new(PendingScan::default()),
        }
    }

    pub(crate) fn overflow(&self) -> Arc<PendingScan> {
        self.overflow.clone()
    }

    /// Queues an event without waiting.
    ///
    /// Suitable for driver callbacks that must not block.
    ///
    /// # Errors
    ///
    /// `EventQueueFull` when the channel has no free slot (except for scan
    /// completions, which are parked instead), `EventQueueClosed` when the
    /// dispatcher has stopped.
    pub fn try_post(&self, event: RadioEvent) -> Result<()> {
        self.tx.try_send(event).or_else(|e| match e {
            TrySendError::Full(RadioEvent::ScanComplete { status, count }) => {
                warn!("Radio event queue full, parking scan completion");
                self.overflow.park(status, count);
                Ok(())
            }
            TrySendError::Full(ev) => {
                warn!("Radio event queue full, dropping {ev:?}");
                Err(WifiMultiError::EventQueueFull)
            }
            TrySendError::Closed(_) => Err(WifiMultiError::EventQueueClosed),
        })
    }

    /// Queues an event, waiting for a free slot.
    ///
    /// # Errors
    ///
    /// `EventQueueClosed` when the dispatcher has stopped.
    pub async fn post(&self, event: RadioEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| WifiMultiError::EventQueueClosed)
    }

    /// Returns `true` once the dispatcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

const FAILED_BIT: u64 = 1 << 32;

/// Coalescing slot for a scan completion that did not fit in the channel.
///
/// Only the latest completion is kept; the driver holds one result buffer,
/// so one fetch releases it whatever the number of completions.
#[derive(Debug, Default)]
pub(crate) struct PendingScan {
    pending: AtomicBool,
    status: AtomicU64,
    count: AtomicU16,
    notify: Notify,
}

impl PendingScan {
    fn park(&self, status: ScanStatus, count: u16) {
        let encoded = match status {
            ScanStatus::Success => 0,
            ScanStatus::Failed(code) => FAILED_BIT | u64::from(code),
        };
        self.status.store(encoded, Ordering::SeqCst);
        self.count.store(count, Ordering::SeqCst);
        self.pending.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Takes the parked completion, if any.
    pub(crate) fn take(&self) -> Option<RadioEvent> {
        if !self.pending.swap(false, Ordering::SeqCst) {
            return None;
        }
        let encoded = self.status.load(Ordering::SeqCst);
        let status = if encoded & FAILED_BIT == 0 {
            ScanStatus::Success
        } else {
            ScanStatus::Failed(encoded as u32)
        };
        Some(RadioEvent::ScanComplete {
            status,
            count: self.count.load(Ordering::SeqCst),
        })
    }

    /// Resolves once a completion has been parked since the last call.
    pub(crate) async fn parked(&self) {
        self.notify.notified().await;
    }
}

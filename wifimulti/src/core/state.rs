//! Link state shared by the scan loop, the connect loop and the dispatcher.
//!
//! The link state lives in a single `watch` channel, so it can only ever
//! hold one of Disconnected, Connecting or Connected, and subscribers never
//! see a value the readers disagree with. Every transition runs inside
//! `send_if_modified`, under the channel's lock. The connector claims the
//! Connecting state with a compare-and-set there; a second tick (or any
//! other task) that lost the race sees the claim fail and backs off.

use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::sync::watch;

use crate::api::models::{LinkState, Timestamp};

const NO_SCAN: u64 = u64::MAX;

#[derive(Debug)]
pub(crate) struct SharedState {
    link_tx: watch::Sender<LinkState>,
    scanning: AtomicBool,
    scan_started: AtomicU64,
    retries: AtomicU32,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        let (link_tx, _) = watch::channel(LinkState::Disconnected);
        Self {
            link_tx,
            scanning: AtomicBool::new(false),
            scan_started: AtomicU64::new(NO_SCAN),
            retries: AtomicU32::new(0),
        }
    }

    pub(crate) fn link(&self) -> LinkState {
        *self.link_tx.borrow()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.link() == LinkState::Connected
    }

    /// Neither connected nor connecting.
    pub(crate) fn is_idle(&self) -> bool {
        self.link() == LinkState::Disconnected
    }

    /// Unconditionally moves to `state`. Used by the dispatcher, whose view
    /// of the radio is authoritative.
    pub(crate) fn set_link(&self, state: LinkState) {
        self.transition(|_| Some(state));
    }

    /// Claims the right to issue a connect request.
    ///
    /// Returns `false` if the link was not Disconnected.
    pub(crate) fn try_begin_connecting(&self) -> bool {
        self.transition(|current| {
            (current == LinkState::Disconnected).then_some(LinkState::Connecting)
        })
    }

    /// Rolls back a claim after the radio refused the request.
    ///
    /// Leaves the state alone if an event already moved it on.
    pub(crate) fn abort_connecting(&self) -> bool {
        self.transition(|current| {
            (current == LinkState::Connecting).then_some(LinkState::Disconnected)
        })
    }

    /// Applies `next` to the current state under the channel lock.
    ///
    /// `next` returns `None` to refuse the transition. Returns whether the
    /// transition was applied; subscribers are only woken on a real change.
    fn transition(&self, next: impl FnOnce(LinkState) -> Option<LinkState>) -> bool {
        let mut applied = false;
        self.link_tx.send_if_modified(|current| {
            let Some(state) = next(*current) else {
                return false;
            };
            applied = true;
            if *current == state {
                return false;
            }
            debug!("link state {current} -> {state}");
            *current = state;
            true
        });
        applied
    }

    pub(crate) fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Marks a scan as in flight since `now`.
    pub(crate) fn begin_scan(&self, now: Timestamp) {
        self.scan_started.store(now.as_micros(), Ordering::SeqCst);
        self.scanning.store(true, Ordering::SeqCst);
    }

    pub(crate) fn end_scan(&self) {
        self.scanning.store(false, Ordering::SeqCst);
        self.scan_started.store(NO_SCAN, Ordering::SeqCst);
    }

    /// When the in-flight scan was started, if one is in flight.
    pub(crate) fn scan_started(&self) -> Option<Timestamp> {
        if !self.is_scanning() {
            return None;
        }
        match self.scan_started.load(Ordering::SeqCst) {
            NO_SCAN => None,
            micros => Some(Timestamp::from_micros(micros)),
        }
    }

    /// Counts a connect attempt; returns the new count.
    pub(crate) fn note_attempt(&self) -> u32 {
        self.retries.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    pub(crate) fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_retries(&self) {
        self.retries.store(0, Ordering::SeqCst);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.link_tx.subscribe()
    }
}

//! In-crate radio double for the loop and dispatcher unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::Result;
use crate::api::models::{ConnectProfile, ScanConfig, ScanRecord, StationConfig, WifiMultiError};
use crate::api::radio::{EventSender, Radio};

#[derive(Default)]
pub(crate) struct MockRadio {
    pub(crate) scans_started: AtomicUsize,
    pub(crate) fetches: AtomicUsize,
    pub(crate) connects: Mutex<Vec<ConnectProfile>>,
    pub(crate) records: Mutex<Vec<ScanRecord>>,
    pub(crate) reject_scan: AtomicBool,
    pub(crate) reject_connect: AtomicBool,
    pub(crate) reject_fetch: AtomicBool,
    pub(crate) events: Mutex<Option<EventSender>>,
}

impl MockRadio {
    pub(crate) fn with_records(records: Vec<ScanRecord>) -> Self {
        let radio = Self::default();
        *radio.records.lock().unwrap() = records;
        radio
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans_started.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn connect_log(&self) -> Vec<ConnectProfile> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Radio for MockRadio {
    async fn start_station(&self, _config: &StationConfig, events: EventSender) -> Result<()> {
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn scan_start(&self, _config: &ScanConfig) -> Result<()> {
        if self.reject_scan.load(Ordering::SeqCst) {
            return Err(WifiMultiError::driver(0x3002, "scan refused"));
        }
        self.scans_started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scan_result_count(&self) -> Result<u16> {
        Ok(self.records.lock().unwrap().len() as u16)
    }

    async fn scan_fetch_records(&self, max: u16) -> Result<Vec<ScanRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.reject_fetch.load(Ordering::SeqCst) {
            return Err(WifiMultiError::driver(0x101, "no memory"));
        }
        let records = self.records.lock().unwrap();
        Ok(records.iter().take(usize::from(max)).cloned().collect())
    }

    async fn connect(&self, profile: &ConnectProfile) -> Result<()> {
        self.connects.lock().unwrap().push(profile.clone());
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(WifiMultiError::driver(0x300a, "connect refused"));
        }
        Ok(())
    }
}

//! Simulated radio shared by the integration tests.
//!
//! Answers every request the way a station driver would: a scan completes
//! immediately with the configured networks, and a connect request either
//! associates and obtains an address or fails authentication.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use wifimulti::{
    ConnectProfile, DisconnectReason, EventSender, Radio, RadioEvent, ScanConfig, ScanRecord,
    ScanStatus, StationConfig, WifiMultiError,
};

#[derive(Default)]
pub struct SimRadio {
    visible: Mutex<Vec<ScanRecord>>,
    pending: Mutex<Vec<ScanRecord>>,
    wrong_password: Mutex<Vec<Vec<u8>>>,
    events: Mutex<Option<EventSender>>,
    connects: Mutex<Vec<Vec<u8>>>,
    scans: AtomicUsize,
    fetches: AtomicUsize,
    pub fail_start: AtomicBool,
    /// Reports `IpLost` just before every scan completion, as a busy driver
    /// interleaves unrelated events.
    pub chatty_scans: AtomicBool,
}

impl SimRadio {
    pub fn new(visible: Vec<ScanRecord>) -> Self {
        let radio = Self::default();
        *radio.visible.lock().unwrap() = visible;
        radio
    }

    /// Makes every connect to `ssid` fail authentication.
    pub fn reject_password_for(&self, ssid: &str) {
        self.wrong_password
            .lock()
            .unwrap()
            .push(ssid.as_bytes().to_vec());
    }

    pub fn set_visible(&self, visible: Vec<ScanRecord>) {
        *self.visible.lock().unwrap() = visible;
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// SSIDs of every connect request, oldest first.
    pub fn connects(&self) -> Vec<String> {
        self.connects
            .lock()
            .unwrap()
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }

    /// Posts from "interrupt context": a full queue drops the event.
    fn post(&self, event: RadioEvent) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            match events.try_post(event) {
                Ok(()) | Err(WifiMultiError::EventQueueFull) => {}
                Err(e) => panic!("unexpected post failure: {e}"),
            }
        }
    }
}

#[async_trait]
impl Radio for SimRadio {
    async fn start_station(
        &self,
        _config: &StationConfig,
        events: EventSender,
    ) -> wifimulti::Result<()> {
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(WifiMultiError::driver(0x3001, "wifi not initialised"));
        }
        *self.events.lock().unwrap() = Some(events);
        self.post(RadioEvent::StationStarted);
        Ok(())
    }

    async fn scan_start(&self, _config: &ScanConfig) -> wifimulti::Result<()> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let found = self.visible.lock().unwrap().clone();
        let count = found.len() as u16;
        *self.pending.lock().unwrap() = found;
        if self.chatty_scans.load(Ordering::SeqCst) {
            self.post(RadioEvent::IpLost);
        }
        self.post(RadioEvent::ScanComplete {
            status: ScanStatus::Success,
            count,
        });
        Ok(())
    }

    async fn scan_result_count(&self) -> wifimulti::Result<u16> {
        Ok(self.pending.lock().unwrap().len() as u16)
    }

    async fn scan_fetch_records(&self, max: u16) -> wifimulti::Result<Vec<ScanRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut pending = self.pending.lock().unwrap();
        let taken: Vec<_> = pending.drain(..).take(usize::from(max)).collect();
        Ok(taken)
    }

    async fn connect(&self, profile: &ConnectProfile) -> wifimulti::Result<()> {
        let ssid = profile.ssid.as_bytes().to_vec();
        self.connects.lock().unwrap().push(ssid.clone());

        let bad = self.wrong_password.lock().unwrap().contains(&ssid);
        if bad {
            self.post(RadioEvent::LinkDisconnected {
                ssid,
                reason: DisconnectReason::AuthFail,
            });
        } else {
            self.post(RadioEvent::LinkConnected { ssid, channel: 6 });
            self.post(RadioEvent::IpAcquired {
                ip: Ipv4Addr::new(192, 168, 4, 2),
            });
        }
        Ok(())
    }
}

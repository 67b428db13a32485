//! Registry of candidate access points.
//!
//! Owns every [`AccessPoint`] descriptor behind a single async mutex. All
//! access goes through [`lock_with_timeout`], so no caller waits longer
//! than the configured lock timeout; callers receive clones, never
//! references into the map.

use log::{debug, trace, warn};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::Result;
use crate::api::models::{
    AccessPoint, DisconnectReason, Passphrase, ScanRecord, Ssid, Timestamp, WifiMultiError,
};
use crate::core::selection::{SelectionPolicy, pick_best};
use crate::util::utils::{decode_ssid_lossy, lock_with_timeout};

const LOCK_NAME: &str = "registry";

/// Keyed collection of candidate access points.
///
/// Iteration order (and therefore the final selection tie-break) is SSID
/// byte order.
#[derive(Debug)]
pub(crate) struct ApRegistry {
    entries: Mutex<BTreeMap<Ssid, AccessPoint>>,
    capacity: usize,
    lock_timeout: Duration,
}

impl ApRegistry {
    pub(crate) fn new(capacity: usize, lock_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            capacity,
            lock_timeout,
        }
    }

    /// Registers a new candidate with zeroed statistics.
    ///
    /// # Errors
    ///
    /// - `InvalidSsid` / `InvalidPassword` for out-of-range lengths
    /// - `DuplicateSsid` if the SSID is already registered
    /// - `RegistryFull` once `capacity` entries exist
    /// - `LockTimeout` if the registry lock could not be taken in time
    pub(crate) async fn add(&self, ssid: &[u8], password: Option<&[u8]>) -> Result<()> {
        let ssid = Ssid::new(ssid)?;
        let password = match password {
            Some(p) => Passphrase::new(p)?,
            None => Passphrase::default(),
        };

        let mut entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;

        if entries.contains_key(&ssid) {
            return Err(WifiMultiError::DuplicateSsid(ssid.to_string()));
        }
        if entries.len() >= self.capacity {
            return Err(WifiMultiError::RegistryFull {
                capacity: self.capacity,
            });
        }

        debug!("Registered access point '{ssid}'");
        entries.insert(ssid.clone(), AccessPoint::new(ssid, password));
        Ok(())
    }

    /// Returns a snapshot of the descriptor for `ssid`.
    pub(crate) async fn find(&self, ssid: &[u8]) -> Result<Option<AccessPoint>> {
        let entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        Ok(entries.get(ssid).cloned())
    }

    /// Returns snapshots of every descriptor.
    pub(crate) async fn snapshot(&self) -> Result<Vec<AccessPoint>> {
        let entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        Ok(entries.values().cloned().collect())
    }

    pub(crate) async fn len(&self) -> Result<usize> {
        let entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        Ok(entries.len())
    }

    /// Folds one scan batch into the registry.
    ///
    /// A record observed strictly later than the stored `last_seen` replaces
    /// signal and timestamp outright. Records sharing the batch timestamp
    /// (one SSID heard from several radios or channels) only ever raise the
    /// stored RSSI. Unknown SSIDs are ignored.
    ///
    /// Returns how many records matched a registered access point.
    pub(crate) async fn update_from_scan(
        &self,
        records: &[ScanRecord],
        now: Timestamp,
    ) -> Result<usize> {
        let mut entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        let mut matched = 0;

        for rec in records {
            let Some(ap) = entries.get_mut(rec.ssid.as_slice()) else {
                trace!("scan: ignoring unregistered ssid {}", decode_ssid_lossy(&rec.ssid));
                continue;
            };
            matched += 1;
            ap.auth_mode = rec.auth_mode;

            match ap.last_seen {
                Some(seen) if now <= seen => {
                    if ap.last_rssi.is_none_or(|rssi| rec.rssi > rssi) {
                        trace!("scan: ssid {} seen again, rssi now {}", ap.ssid, rec.rssi);
                        ap.last_rssi = Some(rec.rssi);
                    }
                }
                _ => {
                    ap.last_rssi = Some(rec.rssi);
                    ap.last_seen = Some(now);
                    trace!(
                        "scan: updated ssid {} seen {:?} rssi {}",
                        ap.ssid, now, rec.rssi
                    );
                }
            }
        }

        Ok(matched)
    }

    /// Returns a snapshot of the best candidate at `now`, if any.
    pub(crate) async fn select_best(
        &self,
        now: Timestamp,
        policy: &dyn SelectionPolicy,
    ) -> Result<Option<AccessPoint>> {
        let entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        Ok(pick_best(entries.values(), now, policy).cloned())
    }

    /// Credits a successful connection. Returns `false` for unknown SSIDs.
    pub(crate) async fn record_success(&self, ssid: &[u8]) -> Result<bool> {
        let mut entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        match entries.get_mut(ssid) {
            Some(ap) => {
                ap.success_count = ap.success_count.saturating_add(1);
                debug!("ssid {}: success #{}", ap.ssid, ap.success_count);
                Ok(true)
            }
            None => {
                warn!("success reported for unregistered ssid {}", decode_ssid_lossy(ssid));
                Ok(false)
            }
        }
    }

    /// Records a failed or dropped connection. Returns `false` for unknown
    /// SSIDs.
    pub(crate) async fn record_failure(
        &self,
        ssid: &[u8],
        reason: DisconnectReason,
    ) -> Result<bool> {
        let mut entries = lock_with_timeout(&self.entries, self.lock_timeout, LOCK_NAME).await?;
        match entries.get_mut(ssid) {
            Some(ap) => {
                ap.fail_count = ap.fail_count.saturating_add(1);
                ap.last_error = Some(reason);
                debug!("ssid {}: failure #{} ({reason})", ap.ssid, ap.fail_count);
                Ok(true)
            }
            None => {
                debug!("failure reported for unregistered ssid {}", decode_ssid_lossy(ssid));
                Ok(false)
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn hold_lock(
        &self,
    ) -> tokio::sync::MutexGuard<'_, BTreeMap<Ssid, AccessPoint>> {
        self.entries.lock().await
    }
}

//! Shared helpers: bounded locking, loop pacing and scan result formatting.

use futures::{FutureExt, select};
use std::fmt::Write;
use std::pin::pin;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::time::{sleep, timeout};

use crate::Result;
use crate::api::models::{ScanRecord, WifiMultiError};

/// Acquires `mutex`, giving up after `wait`.
///
/// `what` names the lock in the resulting [`WifiMultiError::LockTimeout`].
pub(crate) async fn lock_with_timeout<'a, T>(
    mutex: &'a Mutex<T>,
    wait: Duration,
    what: &'static str,
) -> Result<MutexGuard<'a, T>> {
    timeout(wait, mutex.lock())
        .await
        .map_err(|_| WifiMultiError::LockTimeout(what))
}

/// Sleeps for `period` unless shutdown is signalled first.
///
/// Returns `true` when the caller should stop: either a shutdown was sent
/// or the sending side is gone.
pub(crate) async fn sleep_or_shutdown(
    period: Duration,
    shutdown: &mut watch::Receiver<()>,
) -> bool {
    let mut delay = pin!(sleep(period).fuse());
    let mut stop = pin!(shutdown.changed().fuse());

    select! {
        _ = delay => false,
        _ = stop => true,
    }
}

/// Decodes SSID bytes for logging, replacing invalid UTF-8.
pub(crate) fn decode_ssid_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Renders scan records as a fixed-width table.
///
/// ```text
/// ======================================================================
///              SSID             |    RSSI    |           AUTH
/// ======================================================================
///                   HomeNetwork |     -40    |               WPA2-PSK
/// ```
pub(crate) fn format_scan_table(records: &[ScanRecord]) -> String {
    let rule = "=".repeat(70);
    let mut out = String::new();
    let _ = writeln!(out, "-------- scan found {} APs --------", records.len());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^30}|{:^12}|{:^26}", "SSID", "RSSI", "AUTH");
    let _ = writeln!(out, "{rule}");
    for rec in records {
        let ssid: String = decode_ssid_lossy(&rec.ssid).chars().take(26).collect();
        let _ = writeln!(
            out,
            "{:>26}    |    {:>4}    |    {:>22}",
            ssid,
            rec.rssi,
            rec.auth_mode.to_string()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::AuthMode;
    use std::sync::Arc;

    #[test]
    fn decode_ssid_lossy_replaces_invalid_utf8() {
        assert_eq!(decode_ssid_lossy(b"net"), "net");
        assert_eq!(decode_ssid_lossy(&[0xff]), "\u{fffd}");
        assert_eq!(decode_ssid_lossy(&[]), "");
    }

    #[test]
    fn scan_table_lists_every_record() {
        let records = vec![
            ScanRecord::new("alpha", -40, AuthMode::Open),
            ScanRecord::new("beta", -71, AuthMode::Wpa2Psk),
        ];
        let table = format_scan_table(&records);
        assert!(table.contains("scan found 2 APs"));
        assert!(table.contains("alpha"));
        assert!(table.contains("-71"));
        assert!(table.contains("WPA2-PSK"));
    }

    #[tokio::test(start_paused = true)]
    async fn lock_with_timeout_gives_up() {
        let mutex = Arc::new(Mutex::new(()));
        let _held = mutex.lock().await;
        let res = lock_with_timeout(&mutex, Duration::from_millis(10), "scan").await;
        assert!(matches!(res, Err(WifiMultiError::LockTimeout("scan"))));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_or_shutdown_wakes_on_signal() {
        let (tx, mut rx) = watch::channel(());
        let waiter = tokio::spawn(async move {
            sleep_or_shutdown(Duration::from_secs(3600), &mut rx).await
        });
        tx.send(()).unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_or_shutdown_times_out_normally() {
        let (_tx, mut rx) = watch::channel(());
        assert!(!sleep_or_shutdown(Duration::from_millis(500), &mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_or_shutdown_stops_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(());
        drop(tx);
        assert!(sleep_or_shutdown(Duration::from_secs(3600), &mut rx).await);
    }

    #[tokio::test]
    async fn lock_with_timeout_acquires_free_lock() {
        let mutex = Mutex::new(5);
        let guard = lock_with_timeout(&mutex, Duration::from_millis(10), "registry")
            .await
            .unwrap();
        assert_eq!(*guard, 5);
    }
}

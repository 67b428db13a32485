//! End-to-end tests for the manager against a simulated radio.
//!
//! Time is paused, so every scan and connect tick runs on a virtual clock
//! and the tests finish instantly.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::SimRadio;
use tokio::time::sleep;
use wifimulti::{
    AuthMode, DisconnectReason, LinkState, RadioEvent, ScanRecord, WifiMulti, WifiMultiConfig,
    WifiMultiError,
};

fn manager(radio: &Arc<SimRadio>) -> WifiMulti {
    WifiMulti::new(radio.clone(), WifiMultiConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_connects_to_visible_network() {
    let radio = Arc::new(SimRadio::new(vec![ScanRecord::new(
        "home",
        -50,
        AuthMode::Wpa2Psk,
    )]));
    let wifi = manager(&radio);
    wifi.add_access_point("home", Some("password123"))
        .await
        .unwrap();

    let mut link = wifi.subscribe_link();
    wifi.start().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        link.wait_for(|s| *s == LinkState::Connected),
    )
    .await
    .expect("never connected")
    .unwrap();

    assert!(wifi.is_connected());
    assert_eq!(radio.connects(), vec!["home"]);

    sleep(Duration::from_millis(50)).await;
    let home = wifi.find("home").await.unwrap().unwrap();
    assert_eq!(home.success_count, 1);
    assert_eq!(home.fail_count, 0);
    assert_eq!(wifi.retry_count(), 0);

    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_falls_back_after_auth_failure() {
    let radio = Arc::new(SimRadio::new(vec![
        ScanRecord::new("flaky", -30, AuthMode::Wpa2Psk),
        ScanRecord::new("steady", -70, AuthMode::Wpa2Psk),
    ]));
    radio.reject_password_for("flaky");
    let wifi = manager(&radio);
    wifi.add_access_point("flaky", Some("wrong-password"))
        .await
        .unwrap();
    wifi.add_access_point("steady", Some("right-password"))
        .await
        .unwrap();

    wifi.start().await.unwrap();
    sleep(Duration::from_millis(5250)).await;

    // Equal scores at first, so the stronger signal is tried first.
    assert_eq!(radio.connects(), vec!["flaky", "steady"]);
    assert!(wifi.is_connected());

    let flaky = wifi.find("flaky").await.unwrap().unwrap();
    assert_eq!(flaky.fail_count, 1);
    assert_eq!(flaky.last_error, Some(DisconnectReason::AuthFail));
    assert_eq!(wifi.find("steady").await.unwrap().unwrap().success_count, 1);

    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_link_loss() {
    let radio = Arc::new(SimRadio::new(vec![ScanRecord::new(
        "home",
        -55,
        AuthMode::Open,
    )]));
    let wifi = manager(&radio);
    wifi.add_access_point("home", None).await.unwrap();
    wifi.start().await.unwrap();

    sleep(Duration::from_millis(3250)).await;
    assert!(wifi.is_connected());
    assert_eq!(radio.connects().len(), 1);

    wifi.event_sender()
        .post(RadioEvent::LinkDisconnected {
            ssid: b"home".to_vec(),
            reason: DisconnectReason::BeaconTimeout,
        })
        .await
        .unwrap();
    sleep(Duration::from_millis(3000)).await;

    assert!(wifi.is_connected());
    assert_eq!(radio.connects().len(), 2);
    let home = wifi.find("home").await.unwrap().unwrap();
    assert_eq!(home.success_count, 2);
    assert_eq!(home.fail_count, 1);
    assert_eq!(home.last_error, Some(DisconnectReason::BeaconTimeout));

    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_encrypted_network_without_password_is_skipped() {
    let radio = Arc::new(SimRadio::new(vec![
        ScanRecord::new("locked", -40, AuthMode::Wpa2Psk),
        ScanRecord::new("neighbour", -20, AuthMode::Open),
    ]));
    let wifi = manager(&radio);
    wifi.add_access_point("locked", None).await.unwrap();
    wifi.start().await.unwrap();

    sleep(Duration::from_millis(5250)).await;

    assert!(radio.connects().is_empty());
    assert_eq!(wifi.link_state(), LinkState::Disconnected);

    // Still scanned and tracked, only never chosen.
    let locked = wifi.find("locked").await.unwrap().unwrap();
    assert_eq!(locked.auth_mode, AuthMode::Wpa2Psk);
    assert_eq!(locked.last_rssi, Some(-40));
    assert!(locked.lacks_credentials());
    assert_eq!(wifi.access_points().await.unwrap().len(), 1);

    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_every_completed_scan_is_fetched_once() {
    let radio = Arc::new(SimRadio::new(vec![ScanRecord::new(
        "elsewhere",
        -60,
        AuthMode::Open,
    )]));
    let wifi = manager(&radio);
    wifi.add_access_point("home", None).await.unwrap();
    wifi.start().await.unwrap();

    sleep(Duration::from_millis(2250)).await;

    assert!(radio.scans() >= 4);
    assert_eq!(radio.fetches(), radio.scans());
    assert!(radio.connects().is_empty());

    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_scan_completion_survives_full_event_queue() {
    let radio = Arc::new(SimRadio::new(vec![ScanRecord::new(
        "elsewhere",
        -60,
        AuthMode::Open,
    )]));
    radio
        .chatty_scans
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let config = WifiMultiConfig::new().with_event_queue_depth(1);
    let wifi = WifiMulti::new(radio.clone(), config);
    wifi.add_access_point("home", None).await.unwrap();
    wifi.start().await.unwrap();

    sleep(Duration::from_millis(25_250)).await;

    // Each completion lands behind an IpLost in a one-slot queue.
    assert!(radio.scans() >= 20);
    assert_eq!(radio.fetches(), radio.scans());
    assert!(!wifi.is_scanning());
    assert_eq!(wifi.access_points().await.unwrap().len(), 1);

    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_fails() {
    let radio = Arc::new(SimRadio::default());
    let wifi = manager(&radio);
    wifi.start().await.unwrap();
    assert!(matches!(
        wifi.start().await,
        Err(WifiMultiError::AlreadyStarted)
    ));
    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_station_start_can_be_retried() {
    let radio = Arc::new(SimRadio::default());
    radio
        .fail_start
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let wifi = manager(&radio);

    assert!(matches!(
        wifi.start().await,
        Err(WifiMultiError::Driver { code: 0x3001, .. })
    ));
    wifi.start().await.unwrap();
    wifi.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_background_tasks() {
    let radio = Arc::new(SimRadio::default());
    let wifi = manager(&radio);
    wifi.start().await.unwrap();
    sleep(Duration::from_millis(1250)).await;

    wifi.shutdown().await;
    let scans = radio.scans();
    assert!(wifi.event_sender().is_closed());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(radio.scans(), scans);
}

#[tokio::test]
async fn test_registry_limits() {
    let radio = Arc::new(SimRadio::default());
    let config = WifiMultiConfig::new().with_max_access_points(2);
    let wifi = WifiMulti::new(radio, config);

    wifi.add_access_point("one", None).await.unwrap();
    wifi.add_access_point("two", None).await.unwrap();
    assert!(matches!(
        wifi.add_access_point("three", None).await,
        Err(WifiMultiError::RegistryFull { capacity: 2 })
    ));
    assert!(matches!(
        wifi.add_access_point("one", Some("other")).await,
        Err(WifiMultiError::DuplicateSsid(_))
    ));
    assert!(matches!(
        wifi.add_access_point(&"x".repeat(32), None).await,
        Err(WifiMultiError::InvalidSsid { len: 32 })
    ));
}

#[tokio::test]
async fn test_raw_ssid_bytes() {
    let wifi = manager(&Arc::new(SimRadio::default()));
    let raw = [0xe2, 0x98, 0x83, 0xff];
    wifi.add_access_point_bytes(&raw, Some(b"pw".as_slice()))
        .await
        .unwrap();
    let ap = wifi.find(raw).await.unwrap().unwrap();
    assert_eq!(ap.ssid.as_bytes(), raw);
}

#[tokio::test]
async fn test_snapshot_never_serializes_password() {
    let wifi = manager(&Arc::new(SimRadio::default()));
    wifi.add_access_point("home", Some("hunter22")).await.unwrap();

    let json = serde_json::to_value(wifi.access_points().await.unwrap()).unwrap();
    let home = &json[0];
    assert_eq!(home["ssid"], "home");
    assert_eq!(home["success_count"], 0);
    assert!(home.get("password").is_none());
    assert!(!json.to_string().contains("hunter22"));
}

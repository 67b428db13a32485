/// Example running the manager against a simulated radio.
///
/// Three networks are registered. One rejects our password, one is out of
/// range, and one works; the manager tries the strongest first, learns from
/// the failure and settles on the working network.
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wifimulti::{
    AuthMode, ConnectProfile, DisconnectReason, EventSender, Radio, RadioEvent, ScanConfig,
    ScanRecord, ScanStatus, StationConfig, WifiMulti, WifiMultiConfig,
};

#[derive(Default)]
struct SimulatedRadio {
    events: Mutex<Option<EventSender>>,
}

impl SimulatedRadio {
    fn sender(&self) -> Option<EventSender> {
        self.events.lock().ok().and_then(|e| e.clone())
    }

    /// Delivers `event` after `delay`, the way a driver callback would.
    fn post_later(&self, delay: Duration, event: RadioEvent) {
        if let Some(events) = self.sender() {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.post(event).await;
            });
        }
    }

    fn air() -> Vec<ScanRecord> {
        vec![
            ScanRecord::new("Cafe", -41, AuthMode::Wpa2Psk).with_channel(1),
            ScanRecord::new("Home", -67, AuthMode::Wpa2Psk).with_channel(6),
            ScanRecord::new("Neighbour", -58, AuthMode::Wpa3Psk).with_channel(11),
        ]
    }
}

#[async_trait]
impl Radio for SimulatedRadio {
    async fn start_station(
        &self,
        config: &StationConfig,
        events: EventSender,
    ) -> wifimulti::Result<()> {
        println!("radio: station up, country {}", config.country.code);
        if let Ok(mut slot) = self.events.lock() {
            *slot = Some(events);
        }
        self.post_later(Duration::ZERO, RadioEvent::StationStarted);
        Ok(())
    }

    async fn scan_start(&self, _config: &ScanConfig) -> wifimulti::Result<()> {
        self.post_later(
            Duration::from_millis(150),
            RadioEvent::ScanComplete {
                status: ScanStatus::Success,
                count: Self::air().len() as u16,
            },
        );
        Ok(())
    }

    async fn scan_result_count(&self) -> wifimulti::Result<u16> {
        Ok(Self::air().len() as u16)
    }

    async fn scan_fetch_records(&self, max: u16) -> wifimulti::Result<Vec<ScanRecord>> {
        Ok(Self::air().into_iter().take(usize::from(max)).collect())
    }

    async fn connect(&self, profile: &ConnectProfile) -> wifimulti::Result<()> {
        println!("radio: joining {} ({})", profile.ssid, profile.auth_threshold);
        let ssid = profile.ssid.as_bytes().to_vec();
        if profile.ssid.as_bytes() == b"Cafe" {
            self.post_later(
                Duration::from_millis(300),
                RadioEvent::LinkDisconnected {
                    ssid,
                    reason: DisconnectReason::FourWayHandshakeTimeout,
                },
            );
        } else {
            self.post_later(
                Duration::from_millis(200),
                RadioEvent::LinkConnected { ssid, channel: 6 },
            );
            self.post_later(
                Duration::from_millis(400),
                RadioEvent::IpAcquired {
                    ip: Ipv4Addr::new(192, 168, 1, 42),
                },
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> wifimulti::Result<()> {
    let config = WifiMultiConfig::new()
        .with_scan_interval(Duration::from_millis(500))
        .with_connect_interval(Duration::from_secs(1));

    let wifi = WifiMulti::new(Arc::new(SimulatedRadio::default()), config);
    wifi.add_access_point("Cafe", Some("not-the-password")).await?;
    wifi.add_access_point("Home", Some("correct horse")).await?;
    wifi.add_access_point("Office", Some("battery staple")).await?;

    let mut link = wifi.subscribe_link();
    wifi.start().await?;

    let watcher = tokio::time::timeout(Duration::from_secs(10), async {
        while link.changed().await.is_ok() {
            let state = *link.borrow_and_update();
            println!("link: {state}");
            if wifi.is_connected() {
                break;
            }
        }
    });
    if watcher.await.is_err() {
        println!("no connection within 10s");
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("\n{:<10} {:>6} {:>4} {:>4}  last error", "SSID", "RSSI", "ok", "fail");
    for ap in wifi.access_points().await? {
        println!(
            "{:<10} {:>6} {:>4} {:>4}  {}",
            ap.ssid.to_string(),
            ap.last_rssi.map_or("-".to_string(), |r| r.to_string()),
            ap.success_count,
            ap.fail_count,
            ap.last_error.map_or("-".to_string(), |e| e.to_string()),
        );
    }

    wifi.shutdown().await;
    Ok(())
}

//! Radio event handling.
//!
//! The dispatcher is the only consumer of the radio event channel. It keeps
//! the registry statistics and the shared link state in step with what the
//! radio reports. It never starts a connection itself; reconnecting is the
//! connector's job.
//!
//! | Event              | Effect                                                         |
//! |--------------------|----------------------------------------------------------------|
//! | `StationStarted`   | link Disconnected                                              |
//! | `LinkConnected`    | link Connected; credit success when policy is `AtLink`         |
//! | `LinkDisconnected` | `fail_count += 1`, `last_error = reason`; link Disconnected    |
//! | `ScanComplete`     | scanning cleared; on success fetch once and update registry    |
//! | `IpAcquired`       | retry counter reset; credit success when policy is `AtIpAcquired` |
//! | `IpLost`           | logged only                                                    |

use futures::{FutureExt, select};
use log::{debug, info, log_enabled, trace, warn};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};

use crate::api::config::SuccessPolicy;
use crate::api::models::{DisconnectReason, LinkState, RadioEvent, ScanRecord, ScanStatus};
use crate::api::radio::{PendingScan, Radio};
use crate::core::registry::ApRegistry;
use crate::core::state::SharedState;
use crate::util::clock::Clock;
use crate::util::utils::{decode_ssid_lossy, format_scan_table, lock_with_timeout};

/// The access point we are currently associated with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Association {
    ssid: Vec<u8>,
    credited: bool,
}

pub(crate) struct EventDispatcher {
    pub(crate) radio: Arc<dyn Radio>,
    pub(crate) registry: Arc<ApRegistry>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) scan_lock: Arc<Mutex<()>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) lock_timeout: Duration,
    pub(crate) success_policy: SuccessPolicy,
    association: Option<Association>,
}

impl EventDispatcher {
    pub(crate) fn new(
        radio: Arc<dyn Radio>,
        registry: Arc<ApRegistry>,
        state: Arc<SharedState>,
        scan_lock: Arc<Mutex<()>>,
        clock: Arc<dyn Clock>,
        lock_timeout: Duration,
        success_policy: SuccessPolicy,
    ) -> Self {
        Self {
            radio,
            registry,
            state,
            scan_lock,
            clock,
            lock_timeout,
            success_policy,
            association: None,
        }
    }

    /// Applies one event.
    pub(crate) async fn handle(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::StationStarted => {
                debug!("Station started");
                self.association = None;
                self.state.set_link(LinkState::Disconnected);
            }
            RadioEvent::LinkConnected { ssid, channel } => {
                self.on_link_connected(ssid, channel).await;
            }
            RadioEvent::LinkDisconnected { ssid, reason } => {
                self.on_link_disconnected(&ssid, reason).await;
            }
            RadioEvent::ScanComplete { status, count } => {
                self.on_scan_complete(status, count).await;
            }
            RadioEvent::IpAcquired { ip } => {
                info!("Got IP address {ip}");
                self.state.reset_retries();
                if self.success_policy == SuccessPolicy::AtIpAcquired {
                    self.credit_association().await;
                }
            }
            RadioEvent::IpLost => {
                info!("Lost IP address");
            }
        }
    }

    async fn on_link_connected(&mut self, ssid: Vec<u8>, channel: u8) {
        info!("Connected to '{}' on channel {channel}", decode_ssid_lossy(&ssid));
        self.association = Some(Association {
            ssid,
            credited: false,
        });
        if self.success_policy == SuccessPolicy::AtLink {
            self.credit_association().await;
        }
        self.state.set_link(LinkState::Connected);
    }

    async fn on_link_disconnected(&mut self, ssid: &[u8], reason: DisconnectReason) {
        let name = decode_ssid_lossy(ssid);
        if reason.is_auth_failure() {
            info!("Disconnected from '{name}': {reason} (check the password)");
        } else {
            info!("Disconnected from '{name}': {reason}");
        }

        if let Err(e) = self.registry.record_failure(ssid, reason).await {
            warn!("Could not record failure for '{name}': {e}");
        }
        self.association = None;
        self.state.set_link(LinkState::Disconnected);
    }

    /// Credits the current association once.
    async fn credit_association(&mut self) {
        let Some(assoc) = self.association.as_mut() else {
            debug!("Nothing to credit, not associated");
            return;
        };
        if assoc.credited {
            trace!("Association already credited");
            return;
        }
        match self.registry.record_success(&assoc.ssid).await {
            Ok(_) => assoc.credited = true,
            Err(e) => warn!(
                "Could not record success for '{}': {e}",
                decode_ssid_lossy(&assoc.ssid)
            ),
        }
    }

    async fn on_scan_complete(&self, status: ScanStatus, count: u16) {
        self.state.end_scan();
        debug!("Scan complete: {status:?}, {count} APs");

        if status != ScanStatus::Success {
            debug!("Scan failed, registry unchanged");
            return;
        }

        let Some(records) = self.drain_scan_results(count).await else {
            return;
        };

        if log_enabled!(log::Level::Trace) {
            trace!("\n{}", format_scan_table(&records));
        }

        let now = self.clock.now();
        match self.registry.update_from_scan(&records, now).await {
            Ok(matched) => debug!("Scan matched {matched} registered APs"),
            Err(e) => warn!("Skipping scan update: {e}"),
        }
    }

    /// Reads the completed scan's records from the radio, exactly once.
    ///
    /// The scan lock keeps a new scan from starting mid-drain. If it cannot
    /// be had in time the records are fetched anyway: the radio only
    /// releases its result buffer on a fetch.
    async fn drain_scan_results(&self, announced: u16) -> Option<Vec<ScanRecord>> {
        let guard = match lock_with_timeout(&self.scan_lock, self.lock_timeout, "scan").await {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("Fetching scan results without the scan lock: {e}");
                None
            }
        };

        let count = match self.radio.scan_result_count().await {
            Ok(n) => n,
            Err(e) => {
                debug!("Scan result count unavailable ({e}), using {announced}");
                announced
            }
        };

        let fetched = self.radio.scan_fetch_records(count).await;
        drop(guard);

        match fetched {
            Ok(records) => Some(records),
            Err(e) => {
                warn!("Could not fetch scan results, skipping this cycle: {e}");
                None
            }
        }
    }

    /// Drains `events`, and scan completions parked in `overflow`, until
    /// shutdown or until every sender is gone.
    pub(crate) async fn run(
        mut self,
        mut events: mpsc::Receiver<RadioEvent>,
        overflow: Arc<PendingScan>,
        mut shutdown: watch::Receiver<()>,
    ) {
        debug!("Event dispatcher running");
        loop {
            let wake = {
                let mut stop = pin!(shutdown.changed().fuse());
                let mut recv = pin!(events.recv().fuse());
                let mut parked = pin!(overflow.parked().fuse());
                select! {
                    _ = stop => Wake::Stop,
                    event = recv => Wake::Event(event),
                    _ = parked => Wake::Parked,
                }
            };

            let event = match wake {
                Wake::Stop => {
                    debug!("Event dispatcher stopping");
                    break;
                }
                Wake::Event(None) => {
                    warn!("Radio event channel closed");
                    if let Some(event) = overflow.take() {
                        self.handle(event).await;
                    }
                    break;
                }
                Wake::Event(Some(event)) => event,
                Wake::Parked => match overflow.take() {
                    Some(event) => {
                        debug!("Handling scan completion parked on a full queue");
                        event
                    }
                    None => continue,
                },
            };

            trace!("Dispatching {event:?}");
            self.handle(event).await;
        }
    }
}

/// Why the dispatcher loop woke up.
enum Wake {
    Stop,
    Event(Option<RadioEvent>),
    Parked,
}

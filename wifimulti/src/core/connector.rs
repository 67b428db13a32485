//! Selector/connector loop.
//!
//! Once per interval, while the link is down, asks the registry for the
//! best candidate and hands the radio a connect request. Outcomes arrive
//! later as events; this loop never waits for them.

use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::models::ConnectProfile;
use crate::api::radio::Radio;
use crate::core::registry::ApRegistry;
use crate::core::selection::SelectionPolicy;
use crate::core::state::SharedState;
use crate::util::clock::Clock;
use crate::util::utils::sleep_or_shutdown;

/// What a single connector tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectTick {
    /// A connect request was accepted by the radio.
    Requested,
    /// Connected or connecting already.
    NotIdle,
    /// No eligible candidate.
    NoCandidate,
    /// Another task claimed the Connecting state first.
    Raced,
    /// The registry could not be read.
    RegistryBusy,
    /// The radio refused the request.
    Rejected,
}

pub(crate) struct Connector {
    pub(crate) radio: Arc<dyn Radio>,
    pub(crate) registry: Arc<ApRegistry>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: Arc<dyn SelectionPolicy>,
}

impl Connector {
    pub(crate) async fn tick(&self) -> ConnectTick {
        if !self.state.is_idle() {
            return ConnectTick::NotIdle;
        }

        let now = self.clock.now();
        let best = match self.registry.select_best(now, self.policy.as_ref()).await {
            Ok(best) => best,
            Err(e) => {
                warn!("Skipping connect tick: {e}");
                return ConnectTick::RegistryBusy;
            }
        };
        let Some(ap) = best else {
            trace!("No eligible access point");
            return ConnectTick::NoCandidate;
        };

        let profile = ConnectProfile::for_access_point(&ap);

        if !self.state.try_begin_connecting() {
            debug!("Link left Disconnected before connecting to '{}'", ap.ssid);
            return ConnectTick::Raced;
        }
        let attempt = self.state.note_attempt();
        info!(
            "Connecting to '{}' (attempt {attempt}, rssi {:?}, score {})",
            ap.ssid,
            ap.last_rssi,
            self.policy.score(&ap)
        );

        match self.radio.connect(&profile).await {
            Ok(()) => ConnectTick::Requested,
            Err(e) => {
                self.state.abort_connecting();
                warn!("Radio refused connect to '{}': {e}", ap.ssid);
                ConnectTick::Rejected
            }
        }
    }

    /// Ticks every `interval` until shutdown.
    pub(crate) async fn run(self, interval: Duration, mut shutdown: watch::Receiver<()>) {
        debug!("Connect loop running every {interval:?}");
        loop {
            self.tick().await;
            if sleep_or_shutdown(interval, &mut shutdown).await {
                debug!("Connect loop stopping");
                break;
            }
        }
    }
}

//! Candidate selection.
//!
//! Picks the access point most likely to give a working link from what the
//! registry has learned so far. The weighting lives behind
//! [`SelectionPolicy`] so it can be swapped or tuned without touching the
//! registry.
//!
//! An access point is only a candidate when:
//! - a scan has reported it at least once,
//! - it is open, or a passphrase was registered for it,
//! - the last observation is not older than the policy's staleness limit.
//!
//! Candidates are ranked by [`SelectionPolicy::score`], then by signal
//! strength. Remaining ties keep the first candidate in iteration order.

use log::trace;
use std::time::Duration;

use crate::api::models::{AccessPoint, Timestamp};
use crate::types::constants::{scoring, timeouts};

/// Ranking and freshness rules for candidate access points.
pub trait SelectionPolicy: Send + Sync {
    /// Higher is better.
    fn score(&self, ap: &AccessPoint) -> i64;

    /// Returns `true` if the last observation is too old to trust.
    fn is_stale(&self, ap: &AccessPoint, now: Timestamp) -> bool;
}

/// Default policy: `2 * successes - failures`, stale after 20 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePolicy {
    pub success_weight: i64,
    pub fail_weight: i64,
    pub stale_after: Duration,
}

impl ScorePolicy {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            ..Self::default()
        }
    }
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            success_weight: scoring::SUCCESS_WEIGHT,
            fail_weight: scoring::FAIL_WEIGHT,
            stale_after: timeouts::stale_after(),
        }
    }
}

impl SelectionPolicy for ScorePolicy {
    fn score(&self, ap: &AccessPoint) -> i64 {
        self.success_weight * i64::from(ap.success_count)
            - self.fail_weight * i64::from(ap.fail_count)
    }

    fn is_stale(&self, ap: &AccessPoint, now: Timestamp) -> bool {
        match ap.last_seen {
            Some(seen) => now.saturating_duration_since(seen) > self.stale_after,
            None => true,
        }
    }
}

/// Returns `true` if `ap` may be offered to the connector at `now`.
pub(crate) fn is_eligible(ap: &AccessPoint, now: Timestamp, policy: &dyn SelectionPolicy) -> bool {
    if ap.last_seen.is_none() {
        trace!("ssid {}: skipping, not seen yet", ap.ssid);
        return false;
    }
    if ap.lacks_credentials() {
        trace!("ssid {}: skipping, encrypted ({}) but no password", ap.ssid, ap.auth_mode);
        return false;
    }
    if policy.is_stale(ap, now) {
        trace!(
            "ssid {}: skipping, stale (last seen {:?}, now {:?})",
            ap.ssid, ap.last_seen, now
        );
        return false;
    }
    true
}

/// Picks the best eligible access point.
pub(crate) fn pick_best<'a, I>(
    candidates: I,
    now: Timestamp,
    policy: &dyn SelectionPolicy,
) -> Option<&'a AccessPoint>
where
    I: IntoIterator<Item = &'a AccessPoint>,
{
    let mut best: Option<(&AccessPoint, i64)> = None;

    for ap in candidates {
        if !is_eligible(ap, now, policy) {
            continue;
        }
        let score = policy.score(ap);

        match best {
            None => {
                trace!("ssid {}: selecting, nothing else yet", ap.ssid);
                best = Some((ap, score));
            }
            Some((current, current_score)) => {
                if (score, ap.last_rssi) > (current_score, current.last_rssi) {
                    trace!(
                        "ssid {}: selecting over {} (score {score} vs {current_score}, rssi {:?} vs {:?})",
                        ap.ssid, current.ssid, ap.last_rssi, current.last_rssi
                    );
                    best = Some((ap, score));
                }
            }
        }
    }

    best.map(|(ap, _)| ap)
}

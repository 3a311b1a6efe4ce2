//! Health score evolution for routes
//!
//! Additive rewards and multiplicative decay keep a single transient
//! failure from permanently blacklisting a route, while repeated
//! failures drive the score below the eligibility floor quickly
//! (five consecutive hard failures cost 50 points).

use std::time::{SystemTime, UNIX_EPOCH};

use switchboard_core::ErrorKind;

use crate::registry::RouteState;

/// Score added per successful attempt
const SUCCESS_REWARD: u8 = 2;
/// Score removed per hard failure
const FAILURE_PENALTY: u8 = 10;
/// Score removed on a degrade signal (timeouts, rate-limit exhaustion,
/// or a route skipped mid-retry)
const DEGRADE_PENALTY: u8 = 20;
/// Score added per successful active probe
const PROBE_REWARD: u8 = 5;
/// Score removed per failed active probe
const PROBE_PENALTY: u8 = 15;
/// Multiplicative decay applied to the error rate on every outcome
const ERROR_RATE_DECAY: f64 = 0.9;
/// Weight of the previous smoothed latency in the EWMA
const LATENCY_SMOOTHING: f64 = 0.7;

/// Score after one successful attempt
pub(crate) fn success_adjusted(score: u8) -> u8 {
    score.saturating_add(SUCCESS_REWARD).min(100)
}

/// Score after one failed attempt of the given kind
pub(crate) fn failure_adjusted(score: u8, kind: ErrorKind) -> u8 {
    let penalty = match kind {
        ErrorKind::Timeout | ErrorKind::RateLimited => DEGRADE_PENALTY,
        ErrorKind::Auth | ErrorKind::Upstream | ErrorKind::InvalidRequest => FAILURE_PENALTY,
    };
    score.saturating_sub(penalty)
}

/// Score after one active probe
pub(crate) fn probe_adjusted(score: u8, healthy: bool) -> u8 {
    if healthy {
        score.saturating_add(PROBE_REWARD).min(100)
    } else {
        score.saturating_sub(PROBE_PENALTY)
    }
}

/// Record a successful attempt
pub fn record_success(route: &RouteState, latency_ms: f64) {
    route.with_metrics(|m| {
        m.health_score = success_adjusted(m.health_score);
        m.error_rate *= ERROR_RATE_DECAY;
        m.smoothed_latency_ms = if m.smoothed_latency_ms > 0.0 {
            m.smoothed_latency_ms * LATENCY_SMOOTHING + latency_ms * (1.0 - LATENCY_SMOOTHING)
        } else {
            latency_ms
        };
    });
}

/// Record a failed attempt
///
/// Timeouts and exhausted rate limits take the heavier degrade penalty:
/// a timed-out adapter never responded within the attempt budget, and a
/// rate-limited route should drop out of the eligible set faster than
/// one that merely errored.
pub fn record_failure(route: &RouteState, kind: ErrorKind) {
    route.with_metrics(|m| {
        m.health_score = failure_adjusted(m.health_score, kind);
        m.error_rate = m.error_rate.mul_add(ERROR_RATE_DECAY, 1.0 - ERROR_RATE_DECAY);
    });

    tracing::debug!(
        backend = route.backend_id(),
        ?kind,
        health = route.health_score(),
        "attempt failure recorded"
    );
}

/// Apply an explicit degrade signal without touching the error rate
pub fn degrade(route: &RouteState) {
    route.with_metrics(|m| {
        m.health_score = m.health_score.saturating_sub(DEGRADE_PENALTY);
    });
}

/// Run one active probe against the route's adapter
///
/// Runs independently of traffic so a route that recovers during a
/// quiet period is still rehabilitated. Always stamps the check time.
pub async fn active_probe(route: &RouteState) -> bool {
    let healthy = route.backend().health_check().await;

    route.with_metrics(|m| {
        m.health_score = probe_adjusted(m.health_score, healthy);
        m.last_health_check_unix = Some(now_secs());
    });

    tracing::debug!(
        backend = route.backend_id(),
        healthy,
        health = route.health_score(),
        "active probe completed"
    );

    healthy
}

/// Current unix timestamp in seconds
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

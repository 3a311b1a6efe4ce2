//! Response-time strategy: weight health against observed latency

use std::sync::Arc;

use crate::registry::RouteState;

use super::tie_break;

/// Pick the route with the best health-per-latency score
///
/// Score is `(health/100) * (1000 / max(latency_ms, 1))`. A route with
/// no latency samples yet scores as if it answered in one millisecond,
/// which gives fresh routes a chance to accumulate data.
pub fn select(eligible: &[Arc<RouteState>]) -> Option<Arc<RouteState>> {
    eligible
        .iter()
        .min_by(|a, b| {
            score(b)
                .partial_cmp(&score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| tie_break(a, b))
        })
        .map(Arc::clone)
}

fn score(route: &RouteState) -> f64 {
    let (health, latency_ms) = route.with_metrics(|m| (m.health_score, m.smoothed_latency_ms));
    (f64::from(health) / 100.0) * (1000.0 / latency_ms.max(1.0))
}

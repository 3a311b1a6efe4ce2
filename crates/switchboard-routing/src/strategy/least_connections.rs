//! Least-connections strategy: fewest in-flight requests wins

use std::sync::Arc;

use crate::inflight::InFlightTracker;
use crate::registry::RouteState;

use super::tie_break;

/// Pick the route with the fewest in-flight requests attributed to it
pub fn select(
    tenant: &str,
    eligible: &[Arc<RouteState>],
    inflight: &InFlightTracker,
) -> Option<Arc<RouteState>> {
    eligible
        .iter()
        .min_by(|a, b| {
            inflight
                .count(tenant, a.backend_id())
                .cmp(&inflight.count(tenant, b.backend_id()))
                .then_with(|| tie_break(a, b))
        })
        .map(Arc::clone)
}

//! Priority strategy: healthiest first, configuration order second

use std::sync::Arc;

use crate::registry::RouteState;

use super::tie_break;

/// Pick the route with the highest health score, breaking ties by
/// priority ascending then backend id
pub fn select(eligible: &[Arc<RouteState>]) -> Option<Arc<RouteState>> {
    eligible
        .iter()
        .min_by(|a, b| b.health_score().cmp(&a.health_score()).then_with(|| tie_break(a, b)))
        .map(Arc::clone)
}

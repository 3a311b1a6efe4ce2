//! Multi-backend request routing for Switchboard
//!
//! Routes chat requests across a tenant's configured backends: the
//! registry tracks per-route health, a pluggable strategy picks one
//! eligible route, and the dispatch engine retries failed attempts
//! against the remaining routes. Tenants on the multi-model provider
//! family are instead handled by a failover controller that manages a
//! single active-model pointer over a primary plus ordered fallbacks.
//!
//! The [`Router`] facade is the entry point; everything else is the
//! machinery behind it.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod dispatch;
mod error;
mod probe;
mod registry;
mod router;

pub mod events;
pub mod failover;
pub mod health;
pub mod inflight;
pub mod stats;
pub mod strategy;

#[cfg(test)]
mod test_util;

pub use error::RouteError;
pub use events::{EventSink, EventWriter, FailoverEvent, FailoverReason, MemoryEventLog};
pub use failover::{ActiveModelStatus, ModelFailover, ModelStatus};
pub use inflight::{InFlightGuard, InFlightTracker};
pub use registry::{Route, RouteMetrics, RouteRegistry, RouteState, RouteTable};
pub use router::Router;
pub use stats::{AttemptStat, StatsSink, StatsWriter, TracingStatsSink};
pub use strategy::Selector;

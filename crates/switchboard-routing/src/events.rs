//! Failover event log
//!
//! Every active-model transition, attempted or completed, is recorded
//! as a [`FailoverEvent`]. The sink is the source of truth for
//! failover history; status queries read back from it rather than from
//! any in-memory cache. Writes go through a bounded queue and are
//! fire-and-forget: a persistence failure must never abort the routing
//! decision that produced the event.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Queue depth for pending events
const QUEUE_CAPACITY: usize = 256;

/// Why the active-model pointer moved (or was asked to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverReason {
    /// A failed attempt triggered automatic failover
    AutomaticFailover,
    /// An operator switched models explicitly
    ManualSwitch,
    /// Planned maintenance switch
    Maintenance,
}

/// One recorded failover transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverEvent {
    /// Tenant the transition belongs to
    pub tenant_id: String,
    /// Model that was active before
    pub from_model: String,
    /// Model the transition targeted
    pub to_model: String,
    /// What initiated the transition
    pub reason: FailoverReason,
    /// Whether the transition completed
    pub success: bool,
    /// Unix timestamp of the transition
    pub timestamp_unix: u64,
    /// Diagnostic message for failed or annotated transitions
    pub error_message: Option<String>,
}

/// Destination for failover events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist one event
    async fn record(&self, event: FailoverEvent) -> anyhow::Result<()>;

    /// Most recent events for a tenant, newest first
    async fn recent(&self, tenant: &str, limit: usize) -> Vec<FailoverEvent>;
}

/// In-memory event log, the reference sink for tests and development
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<FailoverEvent>>,
}

#[async_trait]
impl EventSink for MemoryEventLog {
    async fn record(&self, event: FailoverEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        Ok(())
    }

    async fn recent(&self, tenant: &str, limit: usize) -> Vec<FailoverEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events
            .iter()
            .rev()
            .filter(|e| e.tenant_id == tenant)
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Bounded asynchronous writer in front of an [`EventSink`]
#[derive(Debug, Clone)]
pub struct EventWriter {
    tx: mpsc::Sender<FailoverEvent>,
}

impl EventWriter {
    /// Spawn the worker task and return the writer handle
    pub fn spawn(sink: Arc<dyn EventSink>) -> Self {
        let (tx, mut rx) = mpsc::channel::<FailoverEvent>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.record(event).await {
                    tracing::warn!(error = %e, "failover event write failed");
                }
            }
        });

        Self { tx }
    }

    /// Enqueue an event without blocking
    pub fn emit(&self, event: FailoverEvent) {
        tracing::info!(
            tenant = %event.tenant_id,
            from = %event.from_model,
            to = %event.to_model,
            reason = ?event.reason,
            success = event.success,
            "failover event"
        );
        if self.tx.try_send(event).is_err() {
            tracing::warn!("failover event queue full, dropping event");
        }
    }
}

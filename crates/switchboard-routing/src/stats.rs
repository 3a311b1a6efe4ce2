//! Usage-statistics emission
//!
//! Every attempt emits one sample. Emission is fire-and-forget through
//! a bounded queue: a full queue or a failing sink is logged and
//! swallowed, never surfaced to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use switchboard_core::ErrorKind;
use tokio::sync::mpsc;

/// Queue depth for pending samples
const QUEUE_CAPACITY: usize = 1024;

/// One dispatch attempt, as seen by the statistics sink
#[derive(Debug, Clone, Serialize)]
pub struct AttemptStat {
    /// Tenant that issued the request
    pub tenant_id: String,
    /// Backend id or model name the attempt targeted
    pub target: String,
    /// Wall-clock attempt latency in milliseconds
    pub latency_ms: u64,
    /// Whether the attempt succeeded
    pub success: bool,
    /// Failure classification, when the attempt failed
    pub error_kind: Option<ErrorKind>,
    /// Unix timestamp of the attempt
    pub timestamp_unix: u64,
}

/// Destination for attempt samples
#[async_trait]
pub trait StatsSink: Send + Sync {
    /// Persist one sample
    async fn record(&self, stat: AttemptStat) -> anyhow::Result<()>;
}

/// Sink that logs samples as structured tracing events
#[derive(Debug, Default)]
pub struct TracingStatsSink;

#[async_trait]
impl StatsSink for TracingStatsSink {
    async fn record(&self, stat: AttemptStat) -> anyhow::Result<()> {
        tracing::debug!(
            tenant = %stat.tenant_id,
            target = %stat.target,
            latency_ms = stat.latency_ms,
            success = stat.success,
            error_kind = ?stat.error_kind,
            "attempt recorded"
        );
        Ok(())
    }
}

/// Bounded asynchronous writer in front of a [`StatsSink`]
///
/// Must be created inside a tokio runtime; the worker task drains the
/// queue for the lifetime of the writer.
#[derive(Debug, Clone)]
pub struct StatsWriter {
    tx: mpsc::Sender<AttemptStat>,
}

impl StatsWriter {
    /// Spawn the worker task and return the writer handle
    pub fn spawn(sink: Arc<dyn StatsSink>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AttemptStat>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(stat) = rx.recv().await {
                if let Err(e) = sink.record(stat).await {
                    tracing::warn!(error = %e, "statistics sink write failed");
                }
            }
        });

        Self { tx }
    }

    /// Enqueue a sample without blocking
    pub fn emit(&self, stat: AttemptStat) {
        if self.tx.try_send(stat).is_err() {
            tracing::warn!("statistics queue full, dropping sample");
        }
    }
}

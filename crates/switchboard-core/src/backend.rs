//! The uniform capability every upstream AI service exposes

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{ChatRequest, ChatResponse, Usage};

/// Trait implemented by each backend adapter
///
/// The routing core treats a backend as an opaque capability: send a
/// chat request, report health, report cost. Attempt timeouts are
/// enforced by the caller; dropping the `chat` future must cancel the
/// in-flight request where the transport allows it (reqwest and
/// friends do this on drop).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable backend identifier
    fn name(&self) -> &str;

    /// Send a chat request
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError>;

    /// Lightweight synthetic health check
    async fn health_check(&self) -> bool;

    /// Verify the configured credentials are accepted upstream
    async fn validate_credentials(&self) -> bool;

    /// Estimate the cost of a request in USD
    fn estimate_cost(&self, usage: &Usage, model: &str) -> f64;
}

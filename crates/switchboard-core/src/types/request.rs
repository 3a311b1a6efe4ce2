use serde::{Deserialize, Serialize};

use super::message::Message;

/// Internal canonical chat request
///
/// Adapters translate this into their provider's wire format. The
/// routing core only ever inspects `model` (to apply a per-attempt
/// model override) and passes the rest through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model override; `None` lets the adapter or controller choose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Conversation messages in order
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Build a request from messages with all parameters defaulted
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Return a copy with the model override applied
    pub fn with_model(&self, model: &str) -> Self {
        let mut request = self.clone();
        request.model = Some(model.to_owned());
        request
    }
}

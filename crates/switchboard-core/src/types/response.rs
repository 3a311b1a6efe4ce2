use serde::{Deserialize, Serialize};

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the `max_tokens` limit
    Length,
    /// Content was filtered by safety systems
    ContentFilter,
    /// Model decided to call a function
    FunctionCall,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion)
    pub total_tokens: u32,
}

/// A single response choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Role is always assistant for chat completions
    pub role: String,
    /// Generated text content
    pub content: String,
    /// Why generation stopped
    pub finish_reason: Option<FinishReason>,
}

impl Choice {
    /// Create a simple assistant text choice
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_owned(),
            content: content.into(),
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Internal canonical chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response identifier
    pub id: String,
    /// Model that produced the response
    pub model: String,
    /// Generated choices
    pub choices: Vec<Choice>,
    /// Token usage statistics
    pub usage: Usage,
}

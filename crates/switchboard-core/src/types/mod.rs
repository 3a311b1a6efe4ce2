//! Canonical request/response types shared by all backend adapters

mod message;
mod request;
mod response;

pub use message::{Message, Role};
pub use request::ChatRequest;
pub use response::{ChatResponse, Choice, FinishReason, Usage};

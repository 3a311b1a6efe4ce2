//! Adapter contract and canonical chat types for Switchboard
//!
//! Everything the routing core knows about an upstream AI service goes
//! through the [`Backend`] trait: send a chat request, report health,
//! report cost. Provider-specific wire formats live in the adapter
//! implementations, never here.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::Backend;
pub use error::{BackendError, ErrorKind};
pub use types::{ChatRequest, ChatResponse, Choice, FinishReason, Message, Role, Usage};

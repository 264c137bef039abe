//! Chat-completion capability for crewkit.
//!
//! Defines the [`ChatModel`] seam consumed by the guardrail classifier, plus
//! one HTTP implementation for OpenAI-compatible chat-completion endpoints.
//! The capability is resolved once by the caller (explicitly or from the
//! environment); nothing here re-probes availability at call time.

pub mod error;
pub mod message;
pub mod openai;

pub use error::{ModelError, Result};
pub use message::{ChatMessage, Role};
pub use openai::OpenAiChatModel;

use async_trait::async_trait;

/// A synchronous (non-streaming) chat-completion capability.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// A short name identifying the model, used in logs and errors.
    fn name(&self) -> &str;

    /// Send the conversation and return the assistant's text reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

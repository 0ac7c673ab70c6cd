//! Chat-completion access
//!
//! [`ChatClient`] is the seam to the hosted model; [`ResponseGenerator`]
//! drives one turn against the persisted conversation.

mod generator;
mod openai;

pub use generator::{ResponseGenerator, TurnOutcome};
pub use openai::OpenAiCompatClient;

use async_trait::async_trait;

use crate::Result;
use crate::conversation::Message;

/// Sampling temperature for every completion
pub const TEMPERATURE: f32 = 1.0;

/// Output token budget for every completion
pub const MAX_TOKENS: u32 = 2048;

/// One chat-completion request
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    /// Full ordered context, system prompt first
    pub messages: &'a [Message],
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A hosted chat-completion endpoint
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Return the assistant text for `request`
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` on network, API or response-shape failure
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String>;
}

//! Conversation history
//!
//! A conversation is the ordered list of chat messages sent to the model as
//! context. It always starts with exactly one system message (the persona
//! prompt); user and assistant turns are only ever appended after it.

mod store;

pub use store::{ConversationStore, clear_audio_dir};

use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered message history, system prompt first
///
/// Serializes as a flat JSON array of `{role, content}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a fresh conversation containing only the system prompt
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Rebuild a conversation from persisted messages
    ///
    /// A system message at index 0 is kept as the persona prompt; otherwise
    /// `fallback_system` is used. System messages anywhere else are dropped
    /// so the result always holds exactly one, at the front. The relative
    /// order of the remaining messages is preserved.
    #[must_use]
    pub fn from_messages(messages: Vec<Message>, fallback_system: &str) -> Self {
        let mut iter = messages.into_iter().peekable();

        let system = match iter.peek() {
            Some(first) if first.role == Role::System => iter.next(),
            _ => None,
        }
        .unwrap_or_else(|| Message::system(fallback_system));

        let mut dropped = 0usize;
        let mut out = vec![system];
        for message in iter {
            if message.role == Role::System {
                dropped += 1;
            } else {
                out.push(message);
            }
        }

        if dropped > 0 {
            tracing::warn!(dropped, "ignored extra system messages in history");
        }

        Self { messages: out }
    }

    /// All messages in order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The persona prompt at index 0
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .map_or("", |message| message.content.as_str())
    }

    /// Number of messages including the system prompt
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: a conversation holds at least the system prompt
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of completed user/assistant exchanges
    #[must_use]
    pub fn turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// Context for a pending request: the history plus the new user message
    #[must_use]
    pub fn with_user(&self, utterance: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(Message::user(utterance));
        messages
    }

    /// Append one completed exchange, user first
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
    }
}

//! Voice Companion - desktop voice chat with a speaking avatar
//!
//! This library provides the pieces of the companion:
//! - Conversation history persisted as a flat message log
//! - Replies from a hosted chat-completion API
//! - Spoken replies through cloud text-to-speech
//! - A two-state avatar (idle / speaking) on its own render thread
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  Conversation Loop                    │
//! │   prompts  │  push-to-talk  │  quit / clear           │
//! └───────┬──────────────┬───────────────────┬───────────┘
//!         │              │                   │ Show / Close
//! ┌───────▼───────┐ ┌────▼──────────┐ ┌──────▼───────────┐
//! │   Response    │ │    Speaker    │ │  Avatar thread    │
//! │   Generator   │ │ TTS → play →  │ │  idle / speaking  │
//! │  + history    │ │ delete        │ │                   │
//! └───────┬───────┘ └────┬──────────┘ └──────────────────┘
//!         │              │
//!   chat completions   Azure / OpenAI speech
//! ```

pub mod avatar;
pub mod capabilities;
pub mod chat_loop;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod setup;
pub mod voice;

pub use avatar::{AvatarPresenter, AvatarState};
pub use capabilities::Capabilities;
pub use chat_loop::ConversationLoop;
pub use config::Config;
pub use conversation::{Conversation, ConversationStore, Message, Role};
pub use error::{Error, Result};
pub use llm::ResponseGenerator;
pub use voice::Speaker;

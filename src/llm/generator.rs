//! One conversation turn against the hosted model

use std::sync::Arc;

use super::{ChatClient, ChatRequest, MAX_TOKENS, TEMPERATURE};
use crate::conversation::{Conversation, ConversationStore};
use crate::{Error, Result};

/// Result of a successful turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// History including the new user and assistant messages
    pub conversation: Conversation,

    /// Assistant reply text
    pub reply: String,

    /// Whether the updated history reached storage
    pub persisted: bool,
}

/// Produces assistant replies and keeps the persisted history in step
#[derive(Clone)]
pub struct ResponseGenerator {
    client: Arc<dyn ChatClient>,
    store: ConversationStore,
    model: String,
}

impl std::fmt::Debug for ResponseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseGenerator")
            .field("store", &self.store)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ResponseGenerator {
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, store: ConversationStore, model: impl Into<String>) -> Self {
        Self {
            client,
            store,
            model: model.into(),
        }
    }

    /// The backing conversation store
    #[must_use]
    pub const fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Run one turn on `conversation`
    ///
    /// The caller's conversation is never modified; on success the returned
    /// conversation is two messages longer and has been written to storage
    /// unless `persisted` is false. On failure the persisted history is left
    /// untouched. The utterance is stored exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` for a blank utterance or a failed
    /// completion call
    pub async fn generate(&self, conversation: &Conversation, utterance: &str) -> Result<TurnOutcome> {
        if utterance.trim().is_empty() {
            return Err(Error::Generation("user utterance is empty".to_string()));
        }

        let context = conversation.with_user(utterance);
        let request = ChatRequest {
            model: &self.model,
            messages: &context,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let reply = self
            .client
            .complete(request)
            .await
            .map_err(Error::into_generation)?;

        let mut updated = conversation.clone();
        updated.push_turn(utterance, reply.as_str());

        let persisted = match self.store.save(&updated) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    path = %self.store.path().display(),
                    error = %e,
                    "failed to persist chat history"
                );
                false
            }
        };

        tracing::debug!(turns = updated.turns(), persisted, "turn complete");
        Ok(TurnOutcome {
            conversation: updated,
            reply,
            persisted,
        })
    }

    /// Load the persisted history and run one turn on it
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` as for [`ResponseGenerator::generate`]
    pub async fn respond(&self, utterance: &str) -> Result<String> {
        let conversation = self.store.load();
        self.generate(&conversation, utterance)
            .await
            .map(|outcome| outcome.reply)
    }
}

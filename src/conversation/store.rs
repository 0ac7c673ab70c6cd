//! Flat-file persistence for the conversation log

use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Conversation, Message};
use crate::Result;

/// Persists the conversation as a JSON array, rewritten in full on save
#[derive(Debug, Clone)]
pub struct ConversationStore {
    path: PathBuf,
    system_prompt: String,
}

impl ConversationStore {
    /// Create a store backed by `path`; `system_prompt` seeds fresh histories
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, system_prompt: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Path of the persisted log
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted conversation
    ///
    /// A missing, unreadable or corrupt file yields a fresh conversation with
    /// only the configured system prompt.
    #[must_use]
    pub fn load(&self) -> Conversation {
        if !self.path.exists() {
            return Conversation::new(&self.system_prompt);
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to read chat history, starting fresh"
                );
                return Conversation::new(&self.system_prompt);
            }
        };

        match serde_json::from_str::<Vec<Message>>(&content) {
            Ok(messages) => {
                let conversation = Conversation::from_messages(messages, &self.system_prompt);
                tracing::debug!(
                    path = %self.path.display(),
                    messages = conversation.len(),
                    "loaded chat history"
                );
                conversation
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to parse chat history, starting fresh"
                );
                Conversation::new(&self.system_prompt)
            }
        }
    }

    /// Overwrite the persisted log with the full conversation
    ///
    /// The snapshot is written to a temporary file next to the target and
    /// renamed over it, so readers never observe a half-written log.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(conversation)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            path = %self.path.display(),
            messages = conversation.len(),
            "saved chat history"
        );
        Ok(())
    }

    /// Delete the persisted log
    ///
    /// Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be removed
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "cleared chat history");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Delete every regular file directly under `dir`
///
/// Returns the number of files removed. A missing directory counts as empty;
/// files that cannot be removed are logged and skipped.
///
/// # Errors
///
/// Returns error if the directory exists but cannot be listed
pub fn clear_audio_dir(dir: &Path) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove audio file");
            }
        }
    }

    tracing::info!(dir = %dir.display(), removed, "cleared audio directory");
    Ok(removed)
}

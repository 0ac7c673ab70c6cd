//! Interactive prompts for the conversation loop

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dialoguer::{Confirm, Input, Select};

use crate::{Error, Result};

/// How the user wants to provide the next message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Text,
    /// Push-to-talk
    Voice,
    Quit,
}

/// What to do with the conversation on quit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuitChoice {
    /// Keep history for next time
    #[default]
    Save,
    /// Delete history and every audio file
    Clear,
}

/// The user-facing side of the conversation loop
///
/// Reads may block for as long as the user takes; the loop races them
/// against the interrupt signal.
#[async_trait]
pub trait Prompter: Send {
    /// Print one line of transcript or status
    fn say(&mut self, line: &str);

    /// Ask for the input mode; `voice` offers the push-to-talk entry
    async fn choose_input(&mut self, voice: bool) -> Result<InputMode>;

    /// Read one line of text
    async fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Yes/no question
    async fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Save or clear on quit
    async fn choose_quit(&mut self) -> Result<QuitChoice>;

    /// Whether a new prompt can be shown; false while an abandoned read
    /// still owns the terminal
    fn is_ready(&self) -> bool {
        true
    }
}

/// Terminal prompts through `dialoguer`
///
/// Each prompt runs on its own detached thread so an interrupt can end the
/// loop without waiting for stdin.
#[derive(Debug, Default)]
pub struct DialoguerPrompter {
    /// Prompt threads still reading the terminal
    pending: Arc<AtomicUsize>,
}

impl DialoguerPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

async fn detached<T, F>(pending: &Arc<AtomicUsize>, prompt: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    let pending = Arc::clone(pending);
    pending.fetch_add(1, Ordering::SeqCst);
    std::thread::spawn(move || {
        let result = prompt();
        pending.fetch_sub(1, Ordering::SeqCst);
        let _ = tx.send(result);
    });

    rx.await
        .map_err(|_| Error::Io(std::io::Error::other("input thread ended")))?
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

#[async_trait]
impl Prompter for DialoguerPrompter {
    fn say(&mut self, line: &str) {
        println!("{line}");
    }

    async fn choose_input(&mut self, voice: bool) -> Result<InputMode> {
        let mut modes = vec![(InputMode::Text, "Type your message")];
        if voice {
            modes.push((InputMode::Voice, "Speak (push-to-talk)"));
        }
        modes.push((InputMode::Quit, "Quit"));

        let labels: Vec<&'static str> = modes.iter().map(|(_, label)| *label).collect();
        let index = detached(&self.pending, move || {
            Select::new()
                .with_prompt("How do you want to communicate?")
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;

        Ok(modes.get(index).map_or(InputMode::Quit, |(mode, _)| *mode))
    }

    async fn read_line(&mut self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();
        detached(&self.pending, move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await
    }

    async fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let prompt = prompt.to_string();
        detached(&self.pending, move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(default)
                .interact()
        })
        .await
    }

    async fn choose_quit(&mut self) -> Result<QuitChoice> {
        let index = detached(&self.pending, || {
            Select::new()
                .with_prompt("Quitting... What about our conversation?")
                .items(&[
                    "Save chat history",
                    "Clear everything (history + audio files)",
                ])
                .default(0)
                .interact()
        })
        .await?;

        Ok(if index == 1 {
            QuitChoice::Clear
        } else {
            QuitChoice::Save
        })
    }

    fn is_ready(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }
}

//! Conversation loop
//!
//! Per turn: input → generation → printed reply → optional speech with the
//! avatar switched to speaking and back to idle. Optional subsystems are
//! present or absent from construction; their failures never end the loop.

mod prompt;

pub use prompt::{DialoguerPrompter, InputMode, Prompter, QuitChoice};

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::avatar::AvatarPresenter;
use crate::conversation::{Conversation, clear_audio_dir};
use crate::llm::ResponseGenerator;
use crate::voice::{AudioCapture, Speaker, SpeechToText, is_audible, save_recording};
use crate::Result;

/// Spoken when the loop ends
pub const FAREWELL: &str = "Bye bye, see you soon!";

/// File name of the push-to-talk recording inside the audio directory
pub const RECORDING_FILE: &str = "conversation.wav";

/// Push-to-talk: record until Enter, then transcribe
#[derive(Debug)]
pub struct PushToTalk {
    stt: SpeechToText,
    recording: PathBuf,
}

impl PushToTalk {
    #[must_use]
    pub fn new(stt: SpeechToText, audio_dir: &Path) -> Self {
        Self {
            stt,
            recording: audio_dir.join(RECORDING_FILE),
        }
    }

    /// Record one utterance; an empty string means nothing was heard
    ///
    /// # Errors
    ///
    /// Returns error if the microphone, the recording file or the
    /// transcription call fails
    #[allow(clippy::future_not_send)]
    pub async fn listen<P: Prompter + ?Sized>(&self, prompter: &mut P) -> Result<String> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;
        prompter.say("[mic] Recording... press Enter to stop");
        let stopped = prompter.read_line("").await;
        capture.stop();
        stopped?;

        let samples = capture.take_buffer();
        let sample_rate = capture.sample_rate();
        drop(capture);

        if !is_audible(&samples, sample_rate) {
            tracing::debug!(samples = samples.len(), "recording too short");
            return Ok(String::new());
        }

        let wav = save_recording(&self.recording, &samples, sample_rate)?;
        let text = self.stt.transcribe(&wav).await?;
        Ok(text.trim().to_string())
    }
}

enum Step {
    Continue,
    Quit,
}

/// The interactive chat session
pub struct ConversationLoop<P> {
    generator: ResponseGenerator,
    conversation: Conversation,
    /// Last turn did not reach storage
    unsaved: bool,
    persona: String,
    audio_dir: PathBuf,
    prompter: P,
    speaker: Option<Speaker>,
    avatar: Option<AvatarPresenter>,
    listener: Option<PushToTalk>,
    auto_play: Option<bool>,
}

impl<P> std::fmt::Debug for ConversationLoop<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationLoop")
            .field("persona", &self.persona)
            .field("voice_output", &self.speaker.is_some())
            .field("voice_input", &self.listener.is_some())
            .field("avatar", &self.avatar.is_some())
            .finish_non_exhaustive()
    }
}

impl<P: Prompter> ConversationLoop<P> {
    /// Text-only loop; attach optional subsystems with the `with_*` methods
    ///
    /// The persisted history is loaded once here and carried in memory for
    /// the rest of the session.
    pub fn new(
        generator: ResponseGenerator,
        persona: impl Into<String>,
        audio_dir: impl Into<PathBuf>,
        prompter: P,
    ) -> Self {
        let conversation = generator.store().load();
        Self {
            generator,
            conversation,
            unsaved: false,
            persona: persona.into(),
            audio_dir: audio_dir.into(),
            prompter,
            speaker: None,
            avatar: None,
            listener: None,
            auto_play: None,
        }
    }

    #[must_use]
    pub fn with_speaker(mut self, speaker: Speaker) -> Self {
        self.speaker = Some(speaker);
        self
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar: AvatarPresenter) -> Self {
        self.avatar = Some(avatar);
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: PushToTalk) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Fix the auto-play choice instead of asking at startup
    #[must_use]
    pub const fn auto_play(mut self, auto_play: Option<bool>) -> Self {
        self.auto_play = auto_play;
        self
    }

    /// Run until the user quits or the process is interrupted
    #[allow(clippy::future_not_send)]
    pub async fn run(self) -> QuitChoice {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for interrupt");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until the user quits or `interrupt` resolves
    ///
    /// An interrupt leads to the quit menu when the terminal is free; if a
    /// prompt is still reading it, the session ends keeping the history.
    #[allow(clippy::future_not_send)]
    pub async fn run_until(mut self, interrupt: impl Future<Output = ()>) -> QuitChoice {
        tokio::pin!(interrupt);

        let auto_play = tokio::select! {
            biased;
            () = &mut interrupt => None,
            auto_play = self.resolve_auto_play() => Some(auto_play),
        };
        let Some(auto_play) = auto_play else {
            return self.interrupted().await;
        };
        self.auto_play = Some(auto_play);
        self.prompter.say("\nReady to chat!\n");

        loop {
            let step = tokio::select! {
                biased;
                () = &mut interrupt => None,
                step = self.turn() => Some(step),
            };

            match step {
                Some(Ok(Step::Continue)) => {}
                Some(Ok(Step::Quit)) => {
                    let choice = self.ask_quit().await;
                    return self.finish(choice, true).await;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "input failed, ending session");
                    return self.finish(QuitChoice::Save, false).await;
                }
                None => return self.interrupted().await,
            }
        }
    }

    async fn ask_quit(&mut self) -> QuitChoice {
        self.prompter.choose_quit().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "quit prompt failed, keeping history");
            QuitChoice::Save
        })
    }

    async fn interrupted(mut self) -> QuitChoice {
        tracing::info!("interrupted");
        self.prompter.say("");
        if let Some(avatar) = &self.avatar {
            avatar.set_idle();
        }

        if !self.prompter.is_ready() {
            tracing::debug!("input still pending, keeping history");
            return self.finish(QuitChoice::Save, false).await;
        }
        let choice = self.ask_quit().await;
        self.finish(choice, true).await
    }

    async fn resolve_auto_play(&mut self) -> bool {
        if self.speaker.is_none() {
            return false;
        }
        let auto_play = match self.auto_play {
            Some(auto_play) => auto_play,
            None => self
                .prompter
                .confirm("Auto-play voice responses?", true)
                .await
                .unwrap_or(true),
        };
        if auto_play {
            self.prompter.say("[OK] Voice auto-play enabled!");
        }
        auto_play
    }

    #[allow(clippy::future_not_send)]
    async fn turn(&mut self) -> Result<Step> {
        let mode = self.prompter.choose_input(self.listener.is_some()).await?;

        let text = match mode {
            InputMode::Quit => return Ok(Step::Quit),
            InputMode::Text => self.prompter.read_line("You").await?,
            InputMode::Voice => self.listen().await,
        };

        let text = text.trim();
        if text.is_empty() {
            self.prompter.say("(No input detected, try again)");
            return Ok(Step::Continue);
        }

        self.prompter
            .say(&format!("\n[...] {} is thinking...", self.persona));

        match self.generator.generate(&self.conversation, text).await {
            Ok(outcome) => {
                if !outcome.persisted && !self.unsaved {
                    self.prompter
                        .say("[!] Chat history could not be saved, keeping it for this session");
                }
                self.unsaved = !outcome.persisted;
                self.conversation = outcome.conversation;
                self.output_response(&outcome.reply).await?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                self.prompter.say(&format!("\n[ERROR] {e}"));
            }
        }

        Ok(Step::Continue)
    }

    #[allow(clippy::future_not_send)]
    async fn listen(&mut self) -> String {
        let Some(listener) = &self.listener else {
            return String::new();
        };

        match listener.listen(&mut self.prompter).await {
            Ok(text) => {
                if !text.is_empty() {
                    self.prompter.say(&format!("You (voice): {text}"));
                }
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice input failed");
                self.prompter.say(&format!("[!] Voice input error: {e}"));
                String::new()
            }
        }
    }

    async fn output_response(&mut self, reply: &str) -> Result<()> {
        self.prompter.say(&format!("\n{}: {reply}", self.persona));

        if self.speaker.is_none() {
            return Ok(());
        }

        let play = if self.auto_play.unwrap_or(false) {
            true
        } else {
            self.prompter.confirm("Play voice?", false).await?
        };

        if play {
            self.speak_response(reply).await;
        }
        Ok(())
    }

    /// Speak with the avatar showing the text; the avatar always ends idle
    async fn speak_response(&mut self, text: &str) {
        let Some(speaker) = &self.speaker else {
            return;
        };

        if let Some(avatar) = &self.avatar {
            avatar.set_speaking(text);
        }

        if let Err(e) = speaker.speak(text).await {
            tracing::warn!(error = %e, "speech failed");
            self.prompter.say(&format!("[!] TTS error: {e}"));
        }

        if let Some(avatar) = &self.avatar {
            avatar.set_idle();
        }
    }

    async fn finish(mut self, choice: QuitChoice, farewell: bool) -> QuitChoice {
        match choice {
            QuitChoice::Clear => self.clear_everything(),
            QuitChoice::Save if self.unsaved => {
                self.prompter.say("[!] Latest chat history could not be saved");
            }
            QuitChoice::Save => self.prompter.say("[OK] Chat history saved!"),
        }

        self.prompter.say(&format!("\n{FAREWELL}"));
        if farewell {
            self.speak_response(FAREWELL).await;
        }

        if let Some(avatar) = self.avatar.take() {
            avatar.close();
        }

        tracing::info!(?choice, "session ended");
        choice
    }

    fn clear_everything(&mut self) {
        let store = self.generator.store();
        match store.clear() {
            Ok(true) => self
                .prompter
                .say(&format!("[OK] Cleared: {}", store.path().display())),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear history");
                self.prompter.say(&format!("[!] Could not clear history: {e}"));
            }
        }

        match clear_audio_dir(&self.audio_dir) {
            Ok(0) => {}
            Ok(count) => self
                .prompter
                .say(&format!("[OK] Cleared: {count} audio file(s)")),
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear audio files");
                self.prompter.say(&format!("[!] Could not clear audio files: {e}"));
            }
        }

        self.prompter.say("[OK] Fresh start ready for next time!");
    }
}

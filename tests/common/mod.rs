//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use voice_companion::avatar::{AvatarSurface, AvatarView};
use voice_companion::chat_loop::{InputMode, Prompter, QuitChoice};
use voice_companion::conversation::{ConversationStore, Message};
use voice_companion::llm::{ChatClient, ChatRequest, ResponseGenerator};
use voice_companion::voice::{AudioSink, Speaker, SpeechSynthesizer};
use voice_companion::{Error, Result};

pub const SYSTEM_PROMPT: &str = "You are Riko.";

/// Store backed by a file inside `dir`
#[must_use]
pub fn store_in(dir: &TempDir) -> ConversationStore {
    ConversationStore::new(dir.path().join("chat_history.json"), SYSTEM_PROMPT)
}

/// Messages currently persisted at `path`
#[must_use]
pub fn persisted(path: &Path) -> Vec<Message> {
    let content = std::fs::read_to_string(path).expect("history file");
    serde_json::from_str(&content).expect("history json")
}

/// Files currently in `dir` (empty when missing)
#[must_use]
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}

/// Chat client answering with a fixed reply, or failing
#[derive(Default)]
pub struct StaticChat {
    reply: Option<String>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl StaticChat {
    #[must_use]
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            requests: Mutex::default(),
        })
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Message lists sent so far
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for StaticChat {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        self.requests.lock().unwrap().push(request.messages.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| Error::Generation("service unavailable".to_string()))
    }
}

#[must_use]
pub fn generator(client: Arc<StaticChat>, store: ConversationStore) -> ResponseGenerator {
    ResponseGenerator::new(client, store, "test-model")
}

/// Synthesizer returning fixed bytes, or failing
pub struct FakeSynth {
    fail: bool,
}

impl FakeSynth {
    #[must_use]
    pub fn ok() -> Arc<Self> {
        Arc::new(Self { fail: false })
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true })
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Synthesis("synthesis service down".to_string()));
        }
        Ok(format!("ID3 {text}").into_bytes())
    }
}

/// Sink recording what it was asked to play
#[derive(Default)]
pub struct FakeSink {
    fail: bool,
    played: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeSink {
    #[must_use]
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            played: Mutex::default(),
        })
    }

    /// Paths played, with whether the file existed at play time
    pub fn played(&self) -> Vec<(PathBuf, bool)> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for FakeSink {
    fn play_file(&self, path: &Path) -> Result<()> {
        self.played
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        if self.fail {
            return Err(Error::Playback("device busy".to_string()));
        }
        Ok(())
    }
}

#[must_use]
pub fn speaker(synth: Arc<FakeSynth>, sink: Arc<FakeSink>, audio_dir: &Path) -> Speaker {
    Speaker::new(synth, sink, audio_dir, "en-US-JennyNeural")
}

/// Avatar surface keeping every painted frame
#[derive(Clone, Default)]
pub struct RecordingSurface {
    frames: Arc<Mutex<Vec<AvatarView>>>,
    torn_down: Arc<Mutex<bool>>,
}

impl RecordingSurface {
    pub fn frames(&self) -> Vec<AvatarView> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<AvatarView> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn torn_down(&self) -> bool {
        *self.torn_down.lock().unwrap()
    }
}

impl AvatarSurface for RecordingSurface {
    fn paint(&mut self, view: &AvatarView) -> Result<()> {
        self.frames.lock().unwrap().push(view.clone());
        Ok(())
    }

    fn teardown(&mut self) {
        *self.torn_down.lock().unwrap() = true;
    }
}

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Answer {
    Mode(InputMode),
    Line(&'static str),
    Confirm(bool),
    Quit(QuitChoice),
}

/// Prompter replaying scripted answers and capturing output
///
/// Running out of answers is reported as an input error, which ends the
/// session the way a closed stdin does.
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    answers: Arc<Mutex<VecDeque<Answer>>>,
    output: Arc<Mutex<Vec<String>>>,
    busy: bool,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            output: Arc::default(),
            busy: false,
        }
    }

    /// Behave as if an earlier read still owns the terminal
    #[must_use]
    pub fn busy(mut self) -> Self {
        self.busy = true;
        self
    }

    pub fn output(&self) -> Vec<String> {
        self.output.lock().unwrap().clone()
    }

    pub fn said(&self, needle: &str) -> bool {
        self.output().iter().any(|line| line.contains(needle))
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self) -> Result<Answer> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Io(std::io::Error::other("script exhausted")))
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    fn say(&mut self, line: &str) {
        self.output.lock().unwrap().push(line.to_string());
    }

    async fn choose_input(&mut self, _voice: bool) -> Result<InputMode> {
        match self.next()? {
            Answer::Mode(mode) => Ok(mode),
            other => panic!("expected input mode, got {other:?}"),
        }
    }

    async fn read_line(&mut self, _prompt: &str) -> Result<String> {
        match self.next()? {
            Answer::Line(line) => Ok(line.to_string()),
            other => panic!("expected line, got {other:?}"),
        }
    }

    async fn confirm(&mut self, _prompt: &str, _default: bool) -> Result<bool> {
        match self.next()? {
            Answer::Confirm(yes) => Ok(yes),
            other => panic!("expected confirmation, got {other:?}"),
        }
    }

    async fn choose_quit(&mut self) -> Result<QuitChoice> {
        match self.next()? {
            Answer::Quit(choice) => Ok(choice),
            other => panic!("expected quit choice, got {other:?}"),
        }
    }

    fn is_ready(&self) -> bool {
        !self.busy
    }
}

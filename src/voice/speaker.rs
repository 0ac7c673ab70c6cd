//! Synthesize-then-play with guaranteed artifact cleanup

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::playback::AudioSink;
use super::tts::SpeechSynthesizer;
use crate::{Error, Result};

/// A synthesized audio file on disk
///
/// The file is deleted when the artifact is dropped, whichever way the
/// owning call exits.
#[derive(Debug)]
pub struct AudioArtifact {
    path: PathBuf,
}

impl AudioArtifact {
    /// Reserve a fresh artifact path under `dir`
    fn reserve(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("tts_{}.mp3", uuid::Uuid::new_v4().simple())),
        }
    }

    /// Location of the audio file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AudioArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "removed audio artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove audio artifact"
            ),
        }
    }
}

/// Speaks text through a synthesizer and an audio sink
#[derive(Clone)]
pub struct Speaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    audio_dir: PathBuf,
    voice: String,
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("audio_dir", &self.audio_dir)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}

impl Speaker {
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        audio_dir: impl Into<PathBuf>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            audio_dir: audio_dir.into(),
            voice: voice.into(),
        }
    }

    /// Voice used by [`Speaker::speak`]
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Directory holding artifacts while they play
    #[must_use]
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Synthesize `text` into a new artifact under the audio directory
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the remote call fails or the file cannot
    /// be written
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioArtifact> {
        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .map_err(|e| Error::Synthesis(format!("failed to create audio dir: {e}")))?;

        let artifact = AudioArtifact::reserve(&self.audio_dir);

        tracing::info!("generating audio");
        let audio = self
            .synthesizer
            .synthesize(text, voice)
            .await
            .map_err(Error::into_synthesis)?;

        tokio::fs::write(artifact.path(), &audio)
            .await
            .map_err(|e| Error::Synthesis(format!("failed to write audio: {e}")))?;

        tracing::debug!(
            path = %artifact.path().display(),
            bytes = audio.len(),
            "audio artifact written"
        );
        Ok(artifact)
    }

    /// Play an artifact, blocking this task until playback ends
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if every playback route fails
    pub async fn play(&self, artifact: &AudioArtifact) -> Result<()> {
        let sink = Arc::clone(&self.sink);
        let path = artifact.path().to_path_buf();

        tracing::info!("playing audio");
        tokio::task::spawn_blocking(move || sink.play_file(&path))
            .await
            .map_err(|e| Error::Playback(format!("playback task failed: {e}")))?
    }

    /// Speak with the configured voice
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` or `Error::Playback`
    pub async fn speak(&self, text: &str) -> Result<()> {
        self.speak_with(text, &self.voice).await
    }

    /// Synthesize and play `text`, then delete the artifact
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` or `Error::Playback`
    pub async fn speak_with(&self, text: &str, voice: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let artifact = self.synthesize(text, voice).await?;
        let result = self.play(&artifact).await;
        drop(artifact);

        if result.is_ok() {
            tracing::info!("speech done");
        }
        result
    }
}

//! Speech-to-text (STT) via the Whisper transcription API

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes recorded speech to text
#[derive(Debug)]
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    endpoint: Url,
}

impl SpeechToText {
    /// Create a Whisper transcriber
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        let endpoint = Url::parse(WHISPER_URL)
            .map_err(|e| Error::Config(format!("invalid transcription endpoint: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint,
        })
    }

    /// Override the request URL (proxies, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Transcribe WAV audio to text
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` if the request fails
    pub async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting Whisper transcription");

        let part = reqwest::multipart::Part::bytes(wav.to_vec())
            .file_name("conversation.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                Error::Transcription(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Transcription(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("failed to parse response: {e}")))?;

        let text = result.text.trim().to_string();
        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

//! Text-to-speech (TTS) synthesis over HTTP

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::{SpeechProviderKind, VoiceConfig};
use crate::{Error, Result};

/// Azure output format; 24 kHz mono matches the playback stream
const AZURE_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Produces encoded audio (MP3) for a piece of text
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the provider voice `voice`
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` on network or service failure
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    Azure,
    OpenAi,
}

/// Synthesizes speech through a cloud TTS API
#[derive(Debug)]
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: Url,
    model: String,
    speed: f32,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a TTS instance using Azure neural voices
    ///
    /// # Errors
    ///
    /// Returns error if the key or region is missing
    pub fn new_azure(api_key: SecretString, region: &str, speed: f32) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Azure speech key required for TTS".to_string()));
        }
        if region.trim().is_empty() {
            return Err(Error::Config(
                "Azure speech region required for TTS".to_string(),
            ));
        }

        let endpoint = Url::parse(&format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            region.trim()
        ))
        .map_err(|e| Error::Config(format!("invalid Azure region {region}: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            model: String::new(),
            speed,
            provider: TtsProvider::Azure,
        })
    }

    /// Create a TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, model: String, speed: f32) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        let endpoint = Url::parse(OPENAI_SPEECH_URL)
            .map_err(|e| Error::Config(format!("invalid TTS endpoint: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint,
            model,
            speed,
            provider: TtsProvider::OpenAi,
        })
    }

    /// Build from the voice section of the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the selected provider is missing credentials
    pub fn from_config(config: &VoiceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_string()))
            .ok_or_else(|| Error::Config("no API key for voice provider".to_string()))?;

        match config.provider {
            SpeechProviderKind::Azure => {
                let region = config.region.as_deref().unwrap_or_default();
                Self::new_azure(api_key, region, config.speed)
            }
            SpeechProviderKind::OpenAi => {
                Self::new_openai(api_key, config.model.clone(), config.speed)
            }
        }
    }

    /// Override the request URL (proxies, tests)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Synthesize using Azure neural TTS (SSML over REST)
    async fn synthesize_azure(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let ssml = build_ssml(text, voice, self.speed);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Ocp-Apim-Subscription-Key", self.api_key.expose_secret())
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", AZURE_OUTPUT_FORMAT)
            .header("User-Agent", concat!("voice-companion/", env!("CARGO_PKG_VERSION")))
            .body(ssml)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        read_audio(response, "Azure").await
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        read_audio(response, "OpenAI").await
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        tracing::debug!(
            provider = ?self.provider,
            voice,
            chars = text.chars().count(),
            "synthesizing speech"
        );

        match self.provider {
            TtsProvider::Azure => self.synthesize_azure(text, voice).await,
            TtsProvider::OpenAi => self.synthesize_openai(text, voice).await,
        }
    }
}

/// Check the status and collect the audio body
async fn read_audio(response: reqwest::Response, provider: &str) -> Result<Vec<u8>> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Synthesis(format!("{provider} TTS error {status}: {body}")));
    }

    let audio = response
        .bytes()
        .await
        .map_err(|e| Error::Synthesis(e.to_string()))?;

    if audio.is_empty() {
        return Err(Error::Synthesis(format!("{provider} TTS returned no audio")));
    }

    Ok(audio.to_vec())
}

/// Wrap text in an SSML document for the given voice
fn build_ssml(text: &str, voice: &str, speed: f32) -> String {
    let lang = voice_locale(voice);
    #[allow(clippy::cast_possible_truncation)]
    let rate = ((speed - 1.0) * 100.0).round() as i32;
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{lang}'>\
<voice name='{voice}'><prosody rate='{rate:+}%'>{}</prosody></voice></speak>",
        escape_xml(text),
        voice = escape_xml(voice),
    )
}

/// Locale prefix of a neural voice id (`en-US-JennyNeural` -> `en-US`)
fn voice_locale(voice: &str) -> String {
    let mut parts = voice.splitn(3, '-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if !lang.is_empty() && !region.is_empty() => {
            format!("{lang}-{region}")
        }
        _ => "en-US".to_string(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

//! Configuration management for the voice companion

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::voice::resolve_voice;
use crate::{Error, Result};

use file::CompanionConfigFile;

/// Voice used when the configuration names none
pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// Voice used with the `OpenAI` backend when none is configured
pub const DEFAULT_OPENAI_VOICE: &str = "nova";

/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Persona used when no preset supplies a system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Riko, a playful and warm companion. \
Keep replies short and conversational, since they are read aloud.";

const DEFAULT_PERSONA_NAME: &str = "Riko";
const DEFAULT_PRESET: &str = "default";
const DEFAULT_HISTORY_FILE: &str = "chat_history.json";
const DEFAULT_AUDIO_DIR: &str = "audio";
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_OPENAI_TTS_MODEL: &str = "tts-1";
const DEFAULT_STT_MODEL: &str = "whisper-1";
const DEFAULT_PREVIEW_CHARS: usize = 50;

/// Resolved companion configuration
#[derive(Debug)]
pub struct Config {
    /// Active persona
    pub persona: PersonaConfig,

    /// Chat-completion provider
    pub chat: ChatConfig,

    /// Path of the persisted conversation log
    pub history_file: PathBuf,

    /// Directory for temporary audio artifacts and recordings
    pub audio_dir: PathBuf,

    /// Voice output
    pub voice: VoiceConfig,

    /// Push-to-talk input
    pub input: InputConfig,

    /// Avatar window
    pub avatar: AvatarConfig,
}

/// Persona selected from the presets
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    /// Preset key
    pub preset: String,

    /// Display name
    pub name: String,

    /// System prompt at the head of the conversation
    pub system_prompt: String,
}

/// Chat-completion provider configuration
#[derive(Debug)]
pub struct ChatConfig {
    pub api_key: SecretString,

    /// Model identifier
    pub model: String,

    /// OpenAI-compatible API base URL
    pub base_url: Url,

    /// Request timeout
    pub timeout: Duration,
}

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechProviderKind {
    /// Azure neural voices (`en-US-JennyNeural`, ...)
    Azure,
    /// `OpenAI` `audio/speech`
    OpenAi,
}

impl SpeechProviderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "azure" | "edge" => Some(Self::Azure),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// Voice used when the config names none
    #[must_use]
    pub const fn default_voice(self) -> &'static str {
        match self {
            Self::Azure => DEFAULT_VOICE,
            Self::OpenAi => DEFAULT_OPENAI_VOICE,
        }
    }
}

/// Voice output configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// Spoken replies requested
    pub enabled: bool,

    /// Speak every reply without asking; `None` means ask at startup
    pub auto_play: Option<bool>,

    /// Provider voice identifier
    pub voice: String,

    pub provider: SpeechProviderKind,

    /// Provider key; voice output is unavailable without one
    pub api_key: Option<SecretString>,

    /// Azure region
    pub region: Option<String>,

    /// Synthesis model (`OpenAI`)
    pub model: String,

    /// Speed multiplier
    pub speed: f32,
}

/// Push-to-talk input configuration
#[derive(Debug)]
pub struct InputConfig {
    /// Offer voice input in the menu
    pub voice: bool,

    /// Transcription model
    pub stt_model: String,

    pub api_key: Option<SecretString>,
}

/// Avatar window configuration
#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub enabled: bool,

    /// Name shown in the window
    pub title: String,

    /// Characters of reply text shown while speaking
    pub preview_chars: usize,
}

impl CompanionConfigFile {
    /// Conversation log location, defaulted
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(self.history_file.as_deref().unwrap_or(DEFAULT_HISTORY_FILE))
    }

    /// Audio directory, defaulted
    #[must_use]
    pub fn audio_path(&self) -> PathBuf {
        PathBuf::from(self.audio_dir.as_deref().unwrap_or(DEFAULT_AUDIO_DIR))
    }
}

impl Config {
    /// Load configuration from the file (explicit path or standard location)
    /// and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be parsed or the chat subsystem is not
    /// configured
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = file::load_config_file(path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with environment lookups
    ///
    /// Environment values win over the file for secrets and the chat model.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the chat API key or model is missing or the
    /// chat base URL is invalid
    pub fn resolve(file: CompanionConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let history_file = file.history_path();
        let audio_dir = file.audio_path();

        // Chat (mandatory)
        let api_key = non_empty(env("COMPANION_CHAT_API_KEY"))
            .or_else(|| non_empty(env("GROQ_API_KEY")))
            .or_else(|| non_empty(file.chat.api_key.clone()))
            .or_else(|| non_empty(file.legacy_api_key.clone()))
            .ok_or_else(|| {
                Error::Config(
                    "chat API key required (set [chat] api_key or GROQ_API_KEY)".to_string(),
                )
            })?;

        let model = non_empty(env("COMPANION_MODEL"))
            .or_else(|| non_empty(file.chat.model.clone()))
            .or_else(|| non_empty(file.legacy_model.clone()))
            .ok_or_else(|| {
                Error::Config("chat model required (set [chat] model)".to_string())
            })?;

        let base_url_raw = non_empty(env("COMPANION_CHAT_BASE_URL"))
            .or_else(|| non_empty(file.chat.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_CHAT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url_raw)
            .map_err(|e| Error::Config(format!("invalid chat base URL {base_url_raw}: {e}")))?;

        let chat = ChatConfig {
            api_key: SecretString::from(api_key),
            model,
            base_url,
            timeout: Duration::from_secs(
                file.chat.timeout_secs.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS),
            ),
        };

        // Persona
        let preset = file
            .preset
            .clone()
            .unwrap_or_else(|| DEFAULT_PRESET.to_string());
        let preset_config = file.presets.get(&preset).cloned().unwrap_or_default();
        if !file.presets.is_empty() && !file.presets.contains_key(&preset) {
            tracing::warn!(preset = %preset, "preset not found, using built-in persona");
        }
        let system_prompt = non_empty(preset_config.system_prompt).unwrap_or_else(|| {
            tracing::warn!(preset = %preset, "no system prompt configured, using built-in persona");
            DEFAULT_SYSTEM_PROMPT.to_string()
        });
        let name = non_empty(preset_config.name)
            .or_else(|| non_empty(file.avatar.title.clone()))
            .unwrap_or_else(|| DEFAULT_PERSONA_NAME.to_string());

        let persona = PersonaConfig {
            preset,
            name: name.clone(),
            system_prompt,
        };

        // Voice output (optional)
        let voice_file = file.voice.into_table();
        let mut voice_enabled = voice_file.enabled.unwrap_or(true);
        let provider = match voice_file.provider.as_deref() {
            None => SpeechProviderKind::Azure,
            Some(raw) => SpeechProviderKind::parse(raw).unwrap_or_else(|| {
                tracing::warn!(provider = %raw, "unknown voice provider, voice output disabled");
                voice_enabled = false;
                SpeechProviderKind::Azure
            }),
        };
        let voice_key = non_empty(voice_file.api_key).or_else(|| match provider {
            SpeechProviderKind::Azure => non_empty(env("AZURE_SPEECH_KEY")),
            SpeechProviderKind::OpenAi => non_empty(env("OPENAI_API_KEY")),
        });
        let region = non_empty(voice_file.region).or_else(|| non_empty(env("AZURE_SPEECH_REGION")));
        let voice = VoiceConfig {
            enabled: voice_enabled,
            auto_play: voice_file.auto_play,
            voice: resolve_voice(
                voice_file
                    .voice
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| provider.default_voice()),
                provider,
            ),
            provider,
            api_key: voice_key.map(SecretString::from),
            region,
            model: voice_file
                .model
                .unwrap_or_else(|| DEFAULT_OPENAI_TTS_MODEL.to_string()),
            speed: voice_file.speed.unwrap_or(1.0),
        };

        // Voice input (optional)
        let input = InputConfig {
            voice: file.input.voice.unwrap_or(false),
            stt_model: file
                .input
                .stt_model
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            api_key: non_empty(file.input.api_key)
                .or_else(|| non_empty(env("OPENAI_API_KEY")))
                .map(SecretString::from),
        };

        let avatar = AvatarConfig {
            enabled: file.avatar.enabled.unwrap_or(true),
            title: non_empty(file.avatar.title).unwrap_or(name),
            preview_chars: file
                .avatar
                .preview_chars
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_PREVIEW_CHARS),
        };

        Ok(Self {
            persona,
            chat,
            history_file,
            audio_dir,
            voice,
            input,
            avatar,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::capabilities::{Capabilities, Overrides};
    use crate::config::file::{PresetFileConfig, VoiceSection};

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal_file() -> CompanionConfigFile {
        let mut file = CompanionConfigFile::default();
        file.chat.api_key = Some("gsk_file".into());
        file.chat.model = Some("llama-3.3-70b-versatile".into());
        file
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut file = minimal_file();
        file.chat.api_key = None;
        let err = Config::resolve(file, env_from(&[])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_model_is_fatal() {
        let mut file = minimal_file();
        file.chat.model = None;
        let err = Config::resolve(file, env_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("model")));
    }

    #[test]
    fn environment_key_wins() {
        let config = Config::resolve(minimal_file(), env_from(&[("GROQ_API_KEY", "gsk_env")])).unwrap();
        assert_eq!(config.chat.api_key.expose_secret(), "gsk_env");
    }

    #[test]
    fn legacy_fields_are_honoured() {
        let mut file = CompanionConfigFile::default();
        file.legacy_api_key = Some("gsk_legacy".into());
        file.legacy_model = Some("llama3-70b-8192".into());
        let config = Config::resolve(file, env_from(&[])).unwrap();
        assert_eq!(config.chat.model, "llama3-70b-8192");
    }

    #[test]
    fn defaults_are_applied() {
        let config = Config::resolve(minimal_file(), env_from(&[])).unwrap();
        assert_eq!(config.voice.voice, DEFAULT_VOICE);
        assert_eq!(config.voice.provider, SpeechProviderKind::Azure);
        assert_eq!(config.history_file, PathBuf::from("chat_history.json"));
        assert_eq!(config.audio_dir, PathBuf::from("audio"));
        assert_eq!(config.avatar.preview_chars, 50);
        assert_eq!(config.chat.base_url.as_str(), "https://api.groq.com/openai/v1");
        assert_eq!(config.persona.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(config.voice.api_key.is_none());
    }

    #[test]
    fn preset_supplies_persona() {
        let mut file = minimal_file();
        file.preset = Some("cozy".into());
        file.presets.insert(
            "cozy".into(),
            PresetFileConfig {
                name: Some("Mochi".into()),
                system_prompt: Some("You are Mochi.".into()),
            },
        );
        let config = Config::resolve(file, env_from(&[])).unwrap();
        assert_eq!(config.persona.name, "Mochi");
        assert_eq!(config.persona.system_prompt, "You are Mochi.");
        assert_eq!(config.avatar.title, "Mochi");
    }

    #[test]
    fn voice_label_resolves_to_provider_id() {
        let mut file = minimal_file();
        file.voice = VoiceSection::Name("cute".into());
        let config = Config::resolve(file, env_from(&[("AZURE_SPEECH_KEY", "az")])).unwrap();
        assert_eq!(config.voice.voice, "en-US-AnaNeural");
        assert!(config.voice.api_key.is_some());
    }

    #[test]
    fn unknown_provider_disables_voice_output() {
        let mut file = minimal_file();
        file.voice = VoiceSection::Table(file::VoiceFileConfig {
            provider: Some("elevenlabs".into()),
            ..file::VoiceFileConfig::default()
        });
        let config = Config::resolve(
            file,
            env_from(&[("AZURE_SPEECH_KEY", "az"), ("AZURE_SPEECH_REGION", "eastus")]),
        )
        .unwrap();

        assert!(!config.voice.enabled);
        let caps = Capabilities::resolve(&config, Overrides::default(), true);
        assert!(!caps.voice_output);
        assert!(
            caps.status_lines()
                .contains(&"[--] Voice output not available".to_string())
        );
    }

    #[test]
    fn openai_provider_gets_openai_voices() {
        let mut file = minimal_file();
        file.voice = VoiceSection::Table(file::VoiceFileConfig {
            provider: Some("openai".into()),
            ..file::VoiceFileConfig::default()
        });
        let config = Config::resolve(file, env_from(&[("OPENAI_API_KEY", "sk")])).unwrap();
        assert_eq!(config.voice.provider, SpeechProviderKind::OpenAi);
        assert_eq!(config.voice.voice, DEFAULT_OPENAI_VOICE);

        let mut file = minimal_file();
        file.voice = VoiceSection::Table(file::VoiceFileConfig {
            provider: Some("openai".into()),
            voice: Some("british".into()),
            ..file::VoiceFileConfig::default()
        });
        let config = Config::resolve(file, env_from(&[])).unwrap();
        assert_eq!(config.voice.voice, "fable");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut file = minimal_file();
        file.chat.base_url = Some("not a url".into());
        assert!(Config::resolve(file, env_from(&[])).is_err());
    }
}

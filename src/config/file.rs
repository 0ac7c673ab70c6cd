//! Configuration file loading
//!
//! Supports `~/.config/voice-companion/config.toml` as a persistent config
//! source, or any path given with `--config`. Files ending in `.yaml`/`.yml`
//! are read as YAML, which also accepts the older flat character-config
//! layout (`GROQ_API_KEY`, `model`, `voice: <name>`).
//! All fields are optional: the file is a partial overlay on top of defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CompanionConfigFile {
    /// Path of the persisted conversation log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_file: Option<String>,

    /// Directory for temporary audio artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_dir: Option<String>,

    /// Name of the active preset in `presets`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Legacy flat layout: chat API key
    #[serde(
        default,
        rename = "GROQ_API_KEY",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_api_key: Option<String>,

    /// Legacy flat layout: chat model
    #[serde(default, rename = "model", skip_serializing_if = "Option::is_none")]
    pub legacy_model: Option<String>,

    /// Persona presets keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presets: BTreeMap<String, PresetFileConfig>,

    /// Chat-completion configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Voice output configuration
    #[serde(default)]
    pub voice: VoiceSection,

    /// Voice input configuration
    #[serde(default)]
    pub input: InputFileConfig,

    /// Avatar window configuration
    #[serde(default)]
    pub avatar: AvatarFileConfig,
}

/// A named persona
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PresetFileConfig {
    /// Display name used in the transcript and avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// System prompt placed at the head of every conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Chat-completion provider configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChatFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier (e.g. "llama-3.3-70b-versatile")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// `voice` accepts either a bare voice name or a full table
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum VoiceSection {
    Name(String),
    Table(VoiceFileConfig),
}

impl Default for VoiceSection {
    fn default() -> Self {
        Self::Table(VoiceFileConfig::default())
    }
}

impl VoiceSection {
    /// Normalize to the table form
    #[must_use]
    pub fn into_table(self) -> VoiceFileConfig {
        match self {
            Self::Name(voice) => VoiceFileConfig {
                voice: Some(voice),
                ..VoiceFileConfig::default()
            },
            Self::Table(table) => table,
        }
    }
}

/// Voice output configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// Enable spoken replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Speak every reply without asking (prompted at startup when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_play: Option<bool>,

    /// Voice label ("cute") or provider voice id ("en-US-AnaNeural")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Synthesis provider ("azure" or "openai")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Azure speech region (e.g. "eastus")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Synthesis model (OpenAI only, e.g. "tts-1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Speed multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

/// Push-to-talk input configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct InputFileConfig {
    /// Offer "speak" in the input menu
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<bool>,

    /// Transcription model (e.g. "whisper-1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Avatar window configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AvatarFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Window title / character name shown by the avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Characters of the reply shown while speaking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_chars: Option<usize>,
}

/// Load the configuration file
///
/// With an explicit `path` the file must exist. Without one, the standard
/// location is tried and a missing file yields defaults.
///
/// # Errors
///
/// Returns error if an explicit file is missing, or any file cannot be read
/// or parsed
pub fn load_config_file(path: Option<&Path>) -> Result<CompanionConfigFile> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match config_file_path() {
            Some(p) => (p, false),
            None => return Ok(CompanionConfigFile::default()),
        },
    };

    if !path.exists() {
        if required {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(CompanionConfigFile::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = parse_config(&path, &content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parse config text, choosing the format from the file extension
///
/// # Errors
///
/// Returns error if the content is not valid for the chosen format
pub fn parse_config(path: &Path, content: &str) -> Result<CompanionConfigFile> {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let parsed = if is_yaml {
        serde_yaml::from_str(content).map_err(Error::from)
    } else {
        toml::from_str(content).map_err(Error::from)
    };

    parsed.map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Return the config file path: `~/.config/voice-companion/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-companion").join("config.toml"))
}

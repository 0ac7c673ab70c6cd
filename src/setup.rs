//! Interactive first-run setup wizard (`companion setup`)

use std::path::Path;

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{
    CompanionConfigFile, PresetFileConfig, VoiceFileConfig, VoiceSection, config_file_path,
    load_config_file,
};
use crate::config::{
    DEFAULT_CHAT_BASE_URL, DEFAULT_OPENAI_VOICE, DEFAULT_SYSTEM_PROMPT, DEFAULT_VOICE,
};
use crate::voice::VOICE_OPTIONS;

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const PROVIDERS: [&str; 2] = ["azure", "openai"];

/// Run the interactive setup wizard
///
/// Writes to `path`, or the standard config location when `None`.
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup(path: Option<&Path>) -> anyhow::Result<()> {
    println!("Voice Companion Setup\n");

    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?,
    };

    // Load existing config if present
    let existing = if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
        load_config_file(Some(&config_path)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "existing config unreadable, starting fresh");
            CompanionConfigFile::default()
        })
    } else {
        CompanionConfigFile::default()
    };

    let config = ask(existing)?;

    write_config(&config_path, &config)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `companion` to start chatting.");

    Ok(())
}

fn ask(mut existing: CompanionConfigFile) -> anyhow::Result<CompanionConfigFile> {
    // 1. Persona
    let preset_key = existing
        .preset
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let current = existing.presets.remove(&preset_key).unwrap_or_default();

    let name: String = Input::new()
        .with_prompt("Companion name")
        .default(current.name.unwrap_or_else(|| "Riko".to_string()))
        .interact_text()?;

    let system_prompt: String = Input::new()
        .with_prompt("System prompt")
        .default(
            current
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        )
        .interact_text()?;

    existing.presets.insert(
        preset_key.clone(),
        PresetFileConfig {
            name: Some(name),
            system_prompt: Some(system_prompt),
        },
    );
    existing.preset = Some(preset_key);

    // 2. Chat provider
    let current_key = existing
        .chat
        .api_key
        .take()
        .or_else(|| existing.legacy_api_key.take());
    existing.chat.api_key = ask_key("Chat API key (GROQ_API_KEY)", current_key)?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(
            existing
                .chat
                .model
                .take()
                .or_else(|| existing.legacy_model.take())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        )
        .interact_text()?;
    existing.chat.model = Some(model);

    let base_url: String = Input::new()
        .with_prompt("Chat API base URL")
        .default(
            existing
                .chat
                .base_url
                .take()
                .unwrap_or_else(|| DEFAULT_CHAT_BASE_URL.to_string()),
        )
        .interact_text()?;
    existing.chat.base_url = Some(base_url);

    // 3. Voice output (optional)
    let voice = std::mem::take(&mut existing.voice).into_table();
    existing.voice = VoiceSection::Table(ask_voice(voice)?);

    // 4. Push-to-talk (optional)
    let enable_input = Confirm::new()
        .with_prompt("Enable push-to-talk voice input (Whisper)?")
        .default(existing.input.voice.unwrap_or(false))
        .interact()?;
    existing.input.voice = Some(enable_input);
    if enable_input {
        let current = existing.input.api_key.take();
        existing.input.api_key = ask_key("OpenAI API key for transcription (OPENAI_API_KEY)", current)?;
    }

    // 5. Avatar
    let enable_avatar = Confirm::new()
        .with_prompt("Show the avatar?")
        .default(existing.avatar.enabled.unwrap_or(true))
        .interact()?;
    existing.avatar.enabled = Some(enable_avatar);

    Ok(existing)
}

fn ask_voice(mut voice: VoiceFileConfig) -> anyhow::Result<VoiceFileConfig> {
    let enabled = Confirm::new()
        .with_prompt("Enable spoken replies?")
        .default(voice.enabled.unwrap_or(true))
        .interact()?;
    voice.enabled = Some(enabled);
    if !enabled {
        return Ok(voice);
    }

    let default_provider = voice
        .provider
        .as_deref()
        .and_then(|p| PROVIDERS.iter().position(|&l| l.eq_ignore_ascii_case(p)))
        .unwrap_or(0);
    let provider_idx = Select::new()
        .with_prompt("Speech provider")
        .items(&PROVIDERS)
        .default(default_provider)
        .interact()?;
    let provider = PROVIDERS[provider_idx];
    voice.provider = Some(provider.to_string());

    let env_hint = if provider == "azure" {
        "Speech API key (AZURE_SPEECH_KEY)"
    } else {
        "Speech API key (OPENAI_API_KEY)"
    };
    let current = voice.api_key.take();
    voice.api_key = ask_key(env_hint, current)?;

    if provider == "azure" {
        let region: String = Input::new()
            .with_prompt("Azure speech region")
            .default(voice.region.take().unwrap_or_else(|| "eastus".to_string()))
            .interact_text()?;
        voice.region = Some(region);

        let labels: Vec<String> = VOICE_OPTIONS
            .iter()
            .map(|o| format!("{:<14} {} ({})", o.label, o.description, o.voice_id))
            .collect();
        let current_voice = voice.voice.as_deref().unwrap_or(DEFAULT_VOICE);
        let default_voice = VOICE_OPTIONS
            .iter()
            .position(|o| o.label == current_voice || o.voice_id == current_voice)
            .unwrap_or(0);
        let voice_idx = Select::new()
            .with_prompt("Voice")
            .items(&labels)
            .default(default_voice)
            .interact()?;
        voice.voice = Some(VOICE_OPTIONS[voice_idx].label.to_string());
    } else {
        let name: String = Input::new()
            .with_prompt("OpenAI voice")
            .default(
                voice
                    .voice
                    .take()
                    .unwrap_or_else(|| DEFAULT_OPENAI_VOICE.to_string()),
            )
            .interact_text()?;
        voice.voice = Some(name);
    }

    let auto_play = Confirm::new()
        .with_prompt("Speak every reply automatically?")
        .default(voice.auto_play.unwrap_or(true))
        .interact()?;
    voice.auto_play = Some(auto_play);

    Ok(voice)
}

/// Prompt for a secret, keeping `current` when left blank
fn ask_key(prompt: &str, current: Option<String>) -> anyhow::Result<Option<String>> {
    let prompt = match current.as_deref() {
        Some(key) => format!("{prompt} (current: {}, leave blank to keep)", mask_key(key)),
        None => prompt.to_string(),
    };

    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.trim().is_empty() {
        current
    } else {
        Some(input.trim().to_string())
    })
}

/// Show only the first and last four characters of a key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Serialize and write the config file
fn write_config(path: &Path, config: &CompanionConfigFile) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml = toml::to_string_pretty(config)?;
    std::fs::write(path, toml)?;

    Ok(())
}

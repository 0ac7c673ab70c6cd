use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_companion::avatar::{AvatarPresenter, LogSurface, TerminalTitleSurface};
use voice_companion::capabilities::{Capabilities, Overrides};
use voice_companion::chat_loop::{ConversationLoop, DialoguerPrompter, PushToTalk};
use voice_companion::config::file::load_config_file;
use voice_companion::config::{AvatarConfig, Config};
use voice_companion::conversation::{ConversationStore, clear_audio_dir};
use voice_companion::llm::{OpenAiCompatClient, ResponseGenerator};
use voice_companion::voice::{
    AudioPlayback, FallbackSink, PLAYBACK_SAMPLE_RATE, Speaker, SpeechToText,
    TextToSpeech, VOICE_OPTIONS,
};

/// Voice Companion - talk to a character that talks back
#[derive(Parser)]
#[command(name = "companion", version, about)]
struct Cli {
    /// Config file (TOML, or YAML by extension)
    #[arg(short, long, env = "COMPANION_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable voice input and output
    #[arg(long, env = "COMPANION_NO_VOICE")]
    no_voice: bool,

    /// Do not open the avatar
    #[arg(long, env = "COMPANION_NO_AVATAR")]
    no_avatar: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start a conversation (default)
    Chat,
    /// Interactive first-run setup
    Setup,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Test speaker output
    TestSpeaker,
    /// Delete chat history and audio files
    Clear,
    /// List the named voices
    Voices,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,voice_companion=info",
        1 => "info,voice_companion=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    let overrides = Overrides {
        no_voice: cli.no_voice,
        no_avatar: cli.no_avatar,
    };

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(config_path, overrides).await,
        Command::Setup => voice_companion::setup::run_setup(config_path),
        Command::TestTts { text } => test_tts(config_path, overrides, &text).await,
        Command::TestSpeaker => test_speaker().await,
        Command::Clear => clear(config_path),
        Command::Voices => {
            voices();
            Ok(())
        }
    }
}

/// Run the interactive conversation
#[allow(clippy::future_not_send)]
async fn chat(config_path: Option<&Path>, overrides: Overrides) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    tracing::debug!(?config, "loaded configuration");

    println!();
    println!("========================================================");
    println!("           Voice Companion - {}", config.persona.name);
    println!("========================================================");
    println!();

    let sink = (!overrides.no_voice && config.voice.enabled).then(FallbackSink::detect);
    let playback_available = sink.as_ref().is_some_and(FallbackSink::is_available);
    let caps = Capabilities::resolve(&config, overrides, playback_available);
    for line in caps.status_lines() {
        println!("{line}");
    }

    let store = ConversationStore::new(&config.history_file, &config.persona.system_prompt);
    let client = OpenAiCompatClient::from_config(&config.chat)?;
    let generator = ResponseGenerator::new(Arc::new(client), store, config.chat.model.clone());

    let mut session = ConversationLoop::new(
        generator,
        config.persona.name.clone(),
        &config.audio_dir,
        DialoguerPrompter::new(),
    )
    .auto_play(config.voice.auto_play);

    if let (true, Some(sink)) = (caps.voice_output, sink) {
        match TextToSpeech::from_config(&config.voice) {
            Ok(tts) => {
                session = session.with_speaker(Speaker::new(
                    Arc::new(tts),
                    Arc::new(sink),
                    &config.audio_dir,
                    &config.voice.voice,
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice output disabled");
                println!("[--] Voice output not available: {e}");
            }
        }
    }

    if caps.voice_input {
        if let Some(key) = config.input.api_key {
            match SpeechToText::new_whisper(key, config.input.stt_model.clone()) {
                Ok(stt) => session = session.with_listener(PushToTalk::new(stt, &config.audio_dir)),
                Err(e) => {
                    tracing::warn!(error = %e, "voice input disabled");
                    println!("[--] Voice input not available: {e}");
                }
            }
        }
    }

    if caps.avatar {
        println!("[*] Opening avatar window...");
        match open_avatar(&config.avatar) {
            Ok(avatar) => session = session.with_avatar(avatar),
            Err(e) => {
                tracing::warn!(error = %e, "avatar disabled");
                println!("[--] Avatar display not available: {e}");
            }
        }
    }

    session.run().await;
    Ok(())
}

/// Open the avatar on the terminal title, or the log when there is no terminal
fn open_avatar(config: &AvatarConfig) -> voice_companion::Result<AvatarPresenter> {
    if std::io::stdout().is_terminal() {
        let name = config.title.clone();
        AvatarPresenter::spawn(config, move || Ok(TerminalTitleSurface::stdout(name)))
    } else {
        AvatarPresenter::spawn(config, || Ok(LogSurface))
    }
}

/// Test TTS output, toggling the avatar around playback
#[allow(clippy::future_not_send)]
async fn test_tts(config_path: Option<&Path>, overrides: Overrides, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load(config_path)?;
    let tts = TextToSpeech::from_config(&config.voice)?;

    let sink = FallbackSink::detect();
    if !sink.is_available() {
        anyhow::bail!("no audio output device or system player found");
    }

    let speaker = Speaker::new(
        Arc::new(tts),
        Arc::new(sink),
        &config.audio_dir,
        &config.voice.voice,
    );

    let avatar = if overrides.no_avatar || !config.avatar.enabled {
        None
    } else {
        open_avatar(&config.avatar)
            .inspect_err(|e| tracing::warn!(error = %e, "avatar disabled"))
            .ok()
    };

    println!("Synthesizing with voice {}...", speaker.voice());
    if let Some(avatar) = &avatar {
        avatar.set_speaking(text);
    }
    let result = speaker.speak(text).await;
    if let Some(avatar) = avatar {
        avatar.set_idle();
        avatar.close();
    }
    result?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), PLAYBACK_SAMPLE_RATE);

    tokio::task::spawn_blocking(move || playback.play(samples, PLAYBACK_SAMPLE_RATE)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Delete history and audio files without starting a chat
fn clear(config_path: Option<&Path>) -> anyhow::Result<()> {
    let file = load_config_file(config_path)?;
    let history = file.history_path();
    let audio_dir = file.audio_path();

    // The system prompt only seeds fresh histories, which clearing never loads
    if ConversationStore::new(&history, "").clear()? {
        println!("[OK] Cleared: {}", history.display());
    } else {
        println!("[--] No history at {}", history.display());
    }

    let count = clear_audio_dir(&audio_dir)?;
    println!("[OK] Cleared: {count} audio file(s)");

    Ok(())
}

/// Print the named voices
fn voices() {
    println!("{:<14} {:<20} {:<8} DESCRIPTION", "LABEL", "AZURE", "OPENAI");
    for option in VOICE_OPTIONS {
        println!(
            "{:<14} {:<20} {:<8} {}",
            option.label, option.voice_id, option.openai_voice, option.description
        );
    }
}

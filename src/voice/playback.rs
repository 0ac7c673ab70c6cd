//! Audio playback to speakers

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays an audio artifact, blocking until playback completes
pub trait AudioSink: Send + Sync {
    /// Play the file at `path`
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if the file cannot be decoded or played
    fn play_file(&self, path: &Path) -> Result<()>;
}

/// Decoded PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Plays audio to the default output device
#[derive(Debug)]
pub struct AudioPlayback {
    device_name: String,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        // Probe once so a missing config is reported at startup
        let config = output_config(&device, PLAYBACK_SAMPLE_RATE)?;
        let device_name = device.name().unwrap_or_default();

        tracing::debug!(
            device = %device_name,
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { device_name })
    }

    /// Play mono samples at `sample_rate`, blocking until done
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be opened
    pub fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device".to_string()))?;

        let config = output_config(&device, sample_rate)?;
        let channels = usize::from(config.channels);
        let sample_count = samples.len();

        let finished = Arc::new(AtomicBool::new(false));
        let finished_clone = Arc::clone(&finished);
        let mut position = 0usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(position).copied().unwrap_or_else(|| {
                            finished_clone.store(true, Ordering::Release);
                            0.0
                        });

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if position < samples.len() {
                            position += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Playback(e.to_string()))?;

        stream.play().map_err(|e| Error::Playback(e.to_string()))?;

        // Poll for completion with timeout
        let duration_ms = (sample_count as u64 * 1000) / u64::from(sample_rate.max(1));
        let start = Instant::now();
        let timeout = Duration::from_millis(duration_ms + 500);

        while !finished.load(Ordering::Acquire) {
            if start.elapsed() > timeout {
                tracing::warn!(duration_ms, "playback did not signal completion, stopping");
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }

    /// Play audio from MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(&self, mp3_data: &[u8]) -> Result<()> {
        let audio = decode_mp3(mp3_data)?;
        self.play(audio.samples, audio.sample_rate)
    }
}

impl AudioSink for AudioPlayback {
    fn play_file(&self, path: &Path) -> Result<()> {
        let data = std::fs::read(path)
            .map_err(|e| Error::Playback(format!("failed to read {}: {e}", path.display())))?;
        tracing::debug!(device = %self.device_name, path = %path.display(), "playing artifact");
        self.play_mp3(&data)
    }
}

/// Find a mono (or stereo) output config supporting `sample_rate`
fn output_config(device: &cpal::Device, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let supports = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| supports(c, 1))
        .or_else(|| {
            // Fallback: try stereo
            device
                .supported_output_configs()
                .ok()?
                .find(|c| supports(c, 2))
        })
        .ok_or_else(|| {
            Error::Playback(format!("no output config for {sample_rate} Hz"))
        })?;

    Ok(supported.with_sample_rate(rate).config())
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not valid MP3 or contains no frames
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                let rate = frame.sample_rate as u32;
                sample_rate.get_or_insert(rate);

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => {}
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| Error::Playback("no MP3 frames in audio".to_string()))?;

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// External players tried when the built-in stream fails, with their
/// "play once and exit" arguments
const SYSTEM_PLAYERS: &[(&str, &[&str])] = &[
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("mpv", &["--no-video", "--really-quiet"]),
    ("mpg123", &["-q"]),
    ("afplay", &[]),
    ("cvlc", &["--play-and-exit", "--quiet"]),
];

/// Plays artifacts by launching an installed command-line player
#[derive(Debug, Clone)]
pub struct SystemPlayer {
    program: PathBuf,
    args: Vec<String>,
}

impl SystemPlayer {
    /// Find the first known player on `PATH`
    #[must_use]
    pub fn detect() -> Option<Self> {
        SYSTEM_PLAYERS.iter().find_map(|(bin, args)| {
            which::which(bin).ok().map(|program| {
                tracing::debug!(player = %program.display(), "found system audio player");
                Self {
                    program,
                    args: args.iter().map(ToString::to_string).collect(),
                }
            })
        })
    }

    /// Use a specific player command
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl AudioSink for SystemPlayer {
    fn play_file(&self, path: &Path) -> Result<()> {
        let status = std::process::Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map_err(|e| {
                Error::Playback(format!("failed to launch {}: {e}", self.program.display()))
            })?;

        if !status.success() {
            return Err(Error::Playback(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        Ok(())
    }
}

/// Built-in playback with a system-player fallback
pub struct FallbackSink {
    primary: Option<Box<dyn AudioSink>>,
    fallback: Option<Box<dyn AudioSink>>,
}

impl FallbackSink {
    #[must_use]
    pub fn new(primary: Option<Box<dyn AudioSink>>, fallback: Option<Box<dyn AudioSink>>) -> Self {
        Self { primary, fallback }
    }

    /// Default chain: speaker stream, then a detected system player
    #[must_use]
    pub fn detect() -> Self {
        let primary = match AudioPlayback::new() {
            Ok(playback) => Some(Box::new(playback) as Box<dyn AudioSink>),
            Err(e) => {
                tracing::warn!(error = %e, "audio output unavailable, relying on system player");
                None
            }
        };
        let fallback = SystemPlayer::detect().map(|p| Box::new(p) as Box<dyn AudioSink>);
        Self::new(primary, fallback)
    }

    /// Whether any way of producing sound exists
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.primary.is_some() || self.fallback.is_some()
    }
}

impl std::fmt::Debug for FallbackSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSink")
            .field("primary", &self.primary.is_some())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl AudioSink for FallbackSink {
    fn play_file(&self, path: &Path) -> Result<()> {
        let mut last_error = None;

        for sink in [&self.primary, &self.fallback].into_iter().flatten() {
            match sink.play_file(path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "audio playback failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Playback("no audio output available".to_string())))
    }
}

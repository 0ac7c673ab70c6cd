//! Push-to-talk microphone capture

use std::path::Path;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Preferred capture rate (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Recordings shorter than this are treated as "nothing said"
const MIN_RECORDING_SECS: f32 = 0.3;

/// Captures audio from the default input device
pub struct AudioCapture {
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl std::fmt::Debug for AudioCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCapture")
            .field("sample_rate", &self.config.sample_rate.0)
            .field("channels", &self.config.channels)
            .field("capturing", &self.stream.is_some())
            .finish()
    }
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// Prefers 16 kHz mono; otherwise uses the device default and downmixes.
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let preferred = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .map(|c| c.with_sample_rate(SampleRate(SAMPLE_RATE)).config());

        let config = match preferred {
            Some(config) => config,
            None => device
                .default_input_config()
                .map_err(|e| Error::Audio(e.to_string()))?
                .config(),
        };

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let channels = usize::from(self.config.channels.max(1));
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.chunks(channels).map(downmix));
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Take the captured samples, leaving the buffer empty
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Capture sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::cast_precision_loss)]
fn downmix(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        0.0
    } else {
        frame.iter().sum::<f32>() / frame.len() as f32
    }
}

/// Whether a recording is long enough to transcribe
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn is_audible(samples: &[f32], sample_rate: u32) -> bool {
    samples.len() as f32 >= MIN_RECORDING_SECS * sample_rate as f32
}

/// Convert f32 samples to 16-bit mono WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Write a recording as WAV, creating the parent directory
///
/// # Errors
///
/// Returns error if encoding or writing fails
pub fn save_recording(path: &Path, samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let wav = samples_to_wav(samples, sample_rate)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &wav)?;
    tracing::debug!(path = %path.display(), bytes = wav.len(), "saved recording");
    Ok(wav)
}

//! Voice processing module
//!
//! Speech output (cloud TTS, playback with cleanup) and push-to-talk input
//! (microphone capture, Whisper transcription).

mod capture;
mod options;
mod playback;
mod speaker;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, is_audible, samples_to_wav, save_recording};
pub use options::{VOICE_OPTIONS, VoiceOption, resolve_voice, voice_for_label};
pub use playback::{
    AudioPlayback, AudioSink, DecodedAudio, FallbackSink, PLAYBACK_SAMPLE_RATE, SystemPlayer,
    decode_mp3,
};
pub use speaker::{AudioArtifact, Speaker};
pub use stt::SpeechToText;
pub use tts::{SpeechSynthesizer, TextToSpeech};

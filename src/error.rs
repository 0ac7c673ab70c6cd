//! Error types for the voice companion

use thiserror::Error;

/// Result type alias for companion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the companion
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing API key, model, unreadable file)
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat-completion call failed or returned nothing usable
    #[error("generation error: {0}")]
    Generation(String),

    /// Speech synthesis failed
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio playback failed
    #[error("playback error: {0}")]
    Playback(String),

    /// Avatar window error
    #[error("presentation error: {0}")]
    Presentation(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the error must stop the process
    ///
    /// Only configuration of the mandatory chat subsystem is fatal; every
    /// other failure is reported and the conversation continues.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Re-tag an error as a generation failure, keeping its message
    #[must_use]
    pub fn into_generation(self) -> Self {
        match self {
            Self::Generation(_) | Self::Config(_) => self,
            other => Self::Generation(other.to_string()),
        }
    }

    /// Re-tag an error as a synthesis failure, keeping its message
    #[must_use]
    pub fn into_synthesis(self) -> Self {
        match self {
            Self::Synthesis(_) | Self::Playback(_) => self,
            other => Self::Synthesis(other.to_string()),
        }
    }
}

//! Optional-subsystem availability, decided once at startup

use crate::config::{Config, SpeechProviderKind};

/// Which optional subsystems are usable in this process
///
/// Call sites check these flags instead of probing for failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Spoken replies (synthesis key present and a playback route exists)
    pub voice_output: bool,

    /// Push-to-talk (transcription key present)
    pub voice_input: bool,

    /// Avatar window
    pub avatar: bool,
}

/// Command-line switches that veto subsystems
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub no_voice: bool,
    pub no_avatar: bool,
}

impl Capabilities {
    /// Decide availability from configuration, switches and whether any
    /// playback route was found
    #[must_use]
    pub fn resolve(config: &Config, overrides: Overrides, playback_available: bool) -> Self {
        let voice_output = !overrides.no_voice
            && config.voice.enabled
            && voice_output_configured(config)
            && playback_available;

        let voice_input =
            !overrides.no_voice && config.input.voice && config.input.api_key.is_some();

        let avatar = !overrides.no_avatar && config.avatar.enabled;

        let caps = Self {
            voice_output,
            voice_input,
            avatar,
        };
        tracing::debug!(?caps, "capabilities resolved");
        caps
    }

    /// Startup status lines, one per subsystem
    #[must_use]
    pub fn status_lines(&self) -> Vec<String> {
        let mark = |on: bool| if on { "[OK]" } else { "[--]" };
        vec![
            format!(
                "{} Voice output {}",
                mark(self.voice_output),
                if self.voice_output { "ready" } else { "not available" }
            ),
            format!(
                "{} Voice input {}",
                mark(self.voice_input),
                if self.voice_input { "ready (push-to-talk)" } else { "disabled" }
            ),
            format!(
                "{} Avatar display {}",
                mark(self.avatar),
                if self.avatar { "ready" } else { "not available" }
            ),
        ]
    }
}

fn voice_output_configured(config: &Config) -> bool {
    if config.voice.api_key.is_none() {
        tracing::info!("no speech API key configured, voice output disabled");
        return false;
    }
    if config.voice.provider == SpeechProviderKind::Azure && config.voice.region.is_none() {
        tracing::warn!("azure voice provider needs a region, voice output disabled");
        return false;
    }
    true
}

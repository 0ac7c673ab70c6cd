//! Named voice presets

use crate::config::SpeechProviderKind;

/// A semantic label mapped to a voice of each provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceOption {
    pub label: &'static str,
    /// Azure neural voice
    pub voice_id: &'static str,
    /// Closest `OpenAI` `audio/speech` voice
    pub openai_voice: &'static str,
    pub description: &'static str,
}

impl VoiceOption {
    /// Voice identifier understood by `provider`
    #[must_use]
    pub const fn id_for(&self, provider: SpeechProviderKind) -> &'static str {
        match provider {
            SpeechProviderKind::Azure => self.voice_id,
            SpeechProviderKind::OpenAi => self.openai_voice,
        }
    }
}

/// Voices offered for selection
pub const VOICE_OPTIONS: &[VoiceOption] = &[
    VoiceOption {
        label: "mature",
        voice_id: "en-US-JennyNeural",
        openai_voice: "alloy",
        description: "Mature, confident",
    },
    VoiceOption {
        label: "friendly",
        voice_id: "en-US-AriaNeural",
        openai_voice: "shimmer",
        description: "Friendly, warm",
    },
    VoiceOption {
        label: "cute",
        voice_id: "en-US-AnaNeural",
        openai_voice: "nova",
        description: "Young, cute",
    },
    VoiceOption {
        label: "energetic",
        voice_id: "en-US-SaraNeural",
        openai_voice: "nova",
        description: "Energetic",
    },
    VoiceOption {
        label: "british",
        voice_id: "en-GB-SoniaNeural",
        openai_voice: "fable",
        description: "British accent",
    },
    VoiceOption {
        label: "british_young",
        voice_id: "en-GB-LibbyNeural",
        openai_voice: "fable",
        description: "British accent, younger",
    },
];

/// Look up a voice option by label (case-insensitive)
#[must_use]
pub fn voice_for_label(label: &str) -> Option<&'static VoiceOption> {
    let label = label.trim();
    VOICE_OPTIONS
        .iter()
        .find(|option| option.label.eq_ignore_ascii_case(label))
}

/// Map a label to the provider's voice id; anything else is taken as a raw id
#[must_use]
pub fn resolve_voice(name: &str, provider: SpeechProviderKind) -> String {
    voice_for_label(name).map_or_else(
        || name.trim().to_string(),
        |o| o.id_for(provider).to_string(),
    )
}

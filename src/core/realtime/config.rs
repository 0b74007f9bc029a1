//! Realtime API configuration types: model, voice, audio format, and the
//! per-session parameter set.

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const REALTIME_API_URL: &str = "wss://api.openai.com/v1/realtime";

/// Name of the tool the model invokes to end the call.
pub const END_CALL_TOOL: &str = "end_call";

/// Description handed to the model for the end-call tool.
pub const END_CALL_TOOL_DESCRIPTION: &str = "Terminates the active phone call. Call this \
function when the conversation is finished or when the caller has indicated they want to \
end the call, for example by saying \"end the call\", \"hang up\", or \"goodbye\".";

/// Transcription model requested for the caller's audio.
pub const INPUT_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Models
// =============================================================================

/// Supported realtime models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RealtimeModel {
    /// GPT-4o Mini Realtime Preview 2024-12-17 (default; narrow-band calls
    /// do not benefit from the larger model)
    #[default]
    #[serde(rename = "gpt-4o-mini-realtime-preview-2024-12-17")]
    Gpt4oMiniRealtimePreview20241217,
    /// GPT-4o Mini Realtime Preview
    #[serde(rename = "gpt-4o-mini-realtime-preview")]
    Gpt4oMiniRealtimePreview,
    /// GPT-4o Realtime Preview
    #[serde(rename = "gpt-4o-realtime-preview")]
    Gpt4oRealtimePreview,
    /// GPT-4o Realtime Preview 2024-12-17
    #[serde(rename = "gpt-4o-realtime-preview-2024-12-17")]
    Gpt4oRealtimePreview20241217,
}

impl RealtimeModel {
    /// API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oMiniRealtimePreview20241217 => "gpt-4o-mini-realtime-preview-2024-12-17",
            Self::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
            Self::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            Self::Gpt4oRealtimePreview20241217 => "gpt-4o-realtime-preview-2024-12-17",
        }
    }

    /// Parse from string, with fallback to the default model.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gpt-4o-mini-realtime-preview-2024-12-17" => Self::Gpt4oMiniRealtimePreview20241217,
            "gpt-4o-mini-realtime-preview" => Self::Gpt4oMiniRealtimePreview,
            "gpt-4o-realtime-preview" => Self::Gpt4oRealtimePreview,
            "gpt-4o-realtime-preview-2024-12-17" => Self::Gpt4oRealtimePreview20241217,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for RealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Available voices for synthesized speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeVoice {
    Alloy,
    Ash,
    Ballad,
    /// Coral voice (default)
    #[default]
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl RealtimeVoice {
    /// API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to the default voice.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for RealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio formats
// =============================================================================

/// Audio encodings accepted and produced by the realtime backend.
///
/// The bridge relays Twilio media payloads opaquely, so both legs must use a
/// compatible narrow-band codec; `g711_ulaw` matches Twilio media streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    /// G.711 u-law, 8 kHz (default; Twilio media-stream encoding)
    #[default]
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
    /// G.711 a-law, 8 kHz
    #[serde(rename = "g711_alaw")]
    G711Alaw,
    /// PCM 16-bit, 24 kHz
    #[serde(rename = "pcm16")]
    Pcm16,
}

impl AudioFormat {
    /// API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
            Self::Pcm16 => "pcm16",
        }
    }

    /// Sample rate of the format in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::G711Ulaw | Self::G711Alaw => 8000,
            Self::Pcm16 => 24000,
        }
    }
}

// =============================================================================
// Session parameters
// =============================================================================

/// Parameters for one realtime session.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// OpenAI API key.
    pub api_key: String,
    pub model: RealtimeModel,
    pub voice: RealtimeVoice,
    /// Audio format used for both input and output.
    pub audio_format: AudioFormat,
    /// System instructions sent in the session handshake.
    pub instructions: String,
    /// Instruction for the assistant's opening line; the backend otherwise
    /// waits for the caller to speak first.
    pub greeting: String,
    pub temperature: f32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: RealtimeModel::default(),
            voice: RealtimeVoice::default(),
            audio_format: AudioFormat::default(),
            instructions: String::new(),
            greeting: String::new(),
            temperature: 0.6,
        }
    }
}

impl RealtimeConfig {
    /// WebSocket URL with the model parameter applied.
    pub fn ws_url(&self) -> String {
        format!("{}?model={}", REALTIME_API_URL, self.model.as_str())
    }
}

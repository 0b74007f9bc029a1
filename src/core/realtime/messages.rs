//! Wire events for the OpenAI Realtime API.
//!
//! Both directions are closed tagged enums: client events serialize to the
//! `type`-tagged JSON the API expects, and server events deserialize from it.
//! Server event types the bridge does not consume fall into
//! [`ServerEvent::Other`] and are ignored, so protocol additions fail closed.

use serde::{Deserialize, Serialize};

// =============================================================================
// Client events (bridge -> backend)
// =============================================================================

/// Events sent to the realtime backend.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure the session: formats, voice, instructions, tools.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },

    /// Append a base64 audio chunk to the input buffer.
    #[serde(rename = "input_audio_buffer.append")]
    AppendAudio { audio: String },

    /// Add a message item to the conversation.
    #[serde(rename = "conversation.item.create")]
    CreateItem { item: MessageItem },

    /// Ask the model to generate a response, optionally with one-off
    /// instructions (used for the opening line).
    #[serde(rename = "response.create")]
    CreateResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseRequest>,
    },

    /// Cancel the in-flight response.
    #[serde(rename = "response.cancel")]
    CancelResponse,
}

/// Session configuration payload for `session.update`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub modalities: Vec<String>,
    pub turn_detection: TurnDetection,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub voice: String,
    pub instructions: String,
    pub input_audio_transcription: TranscriptionRequest,
    pub temperature: f32,
    pub tools: Vec<ToolSpec>,
}

/// Turn-detection mode. The bridge always runs server-side VAD; the backend
/// detects the caller's speech and emits `speech_started` events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad,
}

/// Input-audio transcription request.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionRequest {
    pub model: String,
}

/// Tool declared to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    pub description: String,
}

impl ToolSpec {
    /// A function tool with the given name and description.
    pub fn function(name: &str, description: &str) -> Self {
        Self {
            tool_type: "function".to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Message item payload for `conversation.item.create`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub role: String,
    pub content: Vec<TextContent>,
}

impl MessageItem {
    /// A plain text message from the given role.
    pub fn text(role: &str, text: &str) -> Self {
        Self {
            item_type: "message".to_string(),
            role: role.to_string(),
            content: vec![TextContent {
                content_type: "input_text".to_string(),
                text: text.to_string(),
            }],
        }
    }
}

/// Text content part of a message item.
#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// One-off instructions attached to `response.create`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    pub instructions: String,
}

// =============================================================================
// Server events (backend -> bridge)
// =============================================================================

/// Events received from the realtime backend.
///
/// Only the variants the bridge acts on are modeled; unit variants ignore any
/// additional fields the API sends alongside the tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Session established.
    #[serde(rename = "session.created")]
    SessionCreated,

    /// Session configuration acknowledged.
    #[serde(rename = "session.updated")]
    SessionUpdated,

    /// Base64 audio chunk of the assistant's speech.
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },

    /// Server-side VAD detected the caller speaking.
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// An output item finished; function-call items carry the tool name.
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: OutputItem },

    /// Transcript of the caller's audio.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscript { transcript: String },

    /// Transcript of the assistant's audio.
    #[serde(rename = "response.audio_transcript.done")]
    OutputTranscript { transcript: String },

    /// Response generation finished.
    #[serde(rename = "response.done")]
    ResponseDone,

    /// Backend error.
    #[serde(rename = "error")]
    Error { error: ApiError },

    /// Any event type the bridge does not consume.
    #[serde(other)]
    Other,
}

/// Completed output item from `response.output_item.done`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl OutputItem {
    /// The function name, when this item is a completed function call.
    pub fn function_call_name(&self) -> Option<&str> {
        if self.item_type == "function_call" {
            self.name.as_deref()
        } else {
            None
        }
    }
}

/// Error payload from the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

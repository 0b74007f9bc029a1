//! Realtime leg of a bridge session.
//!
//! [`ConversationLink::connect`] opens the WebSocket to the realtime backend,
//! performs the session handshake, and returns a [`ConversationHandle`] for
//! outbound operations plus a channel of typed [`RealtimeEvent`]s. A single
//! spawned task owns the socket: it drains the outbound command channel and
//! translates inbound server events, so the session never sees a raw frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use super::config::{
    RealtimeConfig, END_CALL_TOOL, END_CALL_TOOL_DESCRIPTION, INPUT_TRANSCRIPTION_MODEL,
};
use super::messages::{
    ClientEvent, MessageItem, ResponseRequest, ServerEvent, SessionUpdate, ToolSpec,
    TranscriptionRequest, TurnDetection,
};
use crate::errors::LinkError;

/// Delay between the session handshake and the greeting request.
///
/// The backend exposes no "configuration applied" signal suitable for gating
/// the first response, so this settle delay is a documented heuristic, not a
/// correctness guarantee. It suspends only the greeting task; audio relay is
/// unaffected.
pub const GREETING_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Capacity of the outbound command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the inbound event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Typed notifications consumed by the bridge session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// Session handshake acknowledged by the backend.
    SessionUpdated,
    /// Base64 audio chunk of assistant speech.
    AudioDelta(String),
    /// Server-side VAD detected the caller speaking.
    SpeechStarted,
    /// A function call finished generating.
    FunctionCallDone { name: String, arguments: String },
    /// Final transcript of a caller utterance.
    InputTranscript(String),
    /// Final transcript of an assistant utterance.
    OutputTranscript(String),
    /// The in-flight response finished.
    ResponseDone,
    /// The realtime leg closed; no further events will arrive.
    Closed,
}

enum LinkCommand {
    Event(ClientEvent),
    Shutdown,
}

/// Outbound operations on the realtime leg.
///
/// The bridge session talks to the leg through this trait so the state
/// machine can be exercised against a recording stub in tests.
#[async_trait]
pub trait RealtimeControl: Send + Sync {
    /// Whether the leg can still accept outbound operations.
    fn is_open(&self) -> bool;
    /// Append a base64 audio payload to the input buffer. No-op when closed.
    async fn append_audio(&self, payload: &str);
    /// Cancel the in-flight response.
    async fn cancel_response(&self);
    /// Add a text message item to the conversation.
    async fn create_item(&self, role: &str, text: &str);
    /// Ask the model to generate a response.
    async fn create_response(&self);
    /// Close the leg. Idempotent.
    async fn shutdown(&self);
}

/// Cloneable handle to a connected realtime leg.
#[derive(Clone)]
pub struct ConversationHandle {
    commands: mpsc::Sender<LinkCommand>,
    open: Arc<AtomicBool>,
}

impl ConversationHandle {
    async fn send(&self, event: ClientEvent) {
        if !self.is_open() {
            tracing::debug!("realtime leg closed, dropping outbound event");
            return;
        }
        if self.commands.send(LinkCommand::Event(event)).await.is_err() {
            self.open.store(false, Ordering::SeqCst);
            tracing::debug!("realtime connection task gone, dropping outbound event");
        }
    }

    /// Request the assistant's opening line.
    pub async fn request_greeting(&self, greeting: &str) {
        self.send(ClientEvent::CreateResponse {
            response: Some(ResponseRequest {
                instructions: greeting.to_string(),
            }),
        })
        .await;
    }
}

#[async_trait]
impl RealtimeControl for ConversationHandle {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn append_audio(&self, payload: &str) {
        self.send(ClientEvent::AppendAudio {
            audio: payload.to_string(),
        })
        .await;
    }

    async fn cancel_response(&self) {
        self.send(ClientEvent::CancelResponse).await;
    }

    async fn create_item(&self, role: &str, text: &str) {
        self.send(ClientEvent::CreateItem {
            item: MessageItem::text(role, text),
        })
        .await;
    }

    async fn create_response(&self) {
        self.send(ClientEvent::CreateResponse { response: None }).await;
    }

    async fn shutdown(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.commands.send(LinkCommand::Shutdown).await;
    }
}

/// Factory for the realtime leg of a session.
pub struct ConversationLink;

impl ConversationLink {
    /// Connect to the realtime backend and perform the session handshake.
    ///
    /// Sends the `session.update` configuration immediately, then requests
    /// the greeting after [`GREETING_SETTLE_DELAY`] from a helper task.
    /// Returns the outbound handle and the inbound event stream; the stream
    /// yields [`RealtimeEvent::Closed`] once before it ends.
    pub async fn connect(
        config: &RealtimeConfig,
    ) -> Result<(ConversationHandle, mpsc::Receiver<RealtimeEvent>), LinkError> {
        let url = config.ws_url();
        let host = Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| LinkError::Connect(format!("invalid realtime URL: {url}")))?;

        let request = http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header("Sec-WebSocket-Protocol", "realtime")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| LinkError::Connect(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| LinkError::Connect(e.to_string()))?;
        tracing::info!(model = %config.model, "connected to realtime backend");

        let (mut ws_sink, mut ws_source) = ws_stream.split();
        let (command_tx, mut command_rx) = mpsc::channel::<LinkCommand>(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>(EVENT_CHANNEL_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));

        let task_open = open.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(LinkCommand::Event(event)) => {
                            let json = match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(e) => {
                                    tracing::error!("failed to serialize client event: {e}");
                                    continue;
                                }
                            };
                            if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                tracing::warn!("realtime send failed: {e}");
                                break;
                            }
                        }
                        Some(LinkCommand::Shutdown) | None => {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    message = ws_source.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(event) => {
                                    if let Some(event) = translate(event) {
                                        if event_tx.send(event).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!("unparseable server event, ignoring: {e}");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if ws_sink.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("realtime backend closed the connection");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("realtime socket error: {e}");
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                }
            }
            task_open.store(false, Ordering::SeqCst);
            let _ = event_tx.send(RealtimeEvent::Closed).await;
        });

        let handle = ConversationHandle {
            commands: command_tx,
            open,
        };

        handle
            .send(ClientEvent::SessionUpdate {
                session: build_session_update(config),
            })
            .await;

        // Greeting goes out after the settle delay without blocking the
        // caller; once the stream binds, audio relay proceeds in parallel.
        let greeting_handle = handle.clone();
        let greeting = config.greeting.clone();
        tokio::spawn(async move {
            tokio::time::sleep(GREETING_SETTLE_DELAY).await;
            greeting_handle.request_greeting(&greeting).await;
        });

        Ok((handle, event_rx))
    }
}

fn build_session_update(config: &RealtimeConfig) -> SessionUpdate {
    SessionUpdate {
        modalities: vec!["text".to_string(), "audio".to_string()],
        turn_detection: TurnDetection::ServerVad,
        input_audio_format: config.audio_format.as_str().to_string(),
        output_audio_format: config.audio_format.as_str().to_string(),
        voice: config.voice.as_str().to_string(),
        instructions: config.instructions.clone(),
        input_audio_transcription: TranscriptionRequest {
            model: INPUT_TRANSCRIPTION_MODEL.to_string(),
        },
        temperature: config.temperature,
        tools: vec![ToolSpec::function(END_CALL_TOOL, END_CALL_TOOL_DESCRIPTION)],
    }
}

/// Map a wire event to the notification set the session consumes.
///
/// Returns `None` for events that are logged (or silently ignored) here and
/// never reach the session.
fn translate(event: ServerEvent) -> Option<RealtimeEvent> {
    match event {
        ServerEvent::SessionCreated => {
            tracing::info!("realtime session created");
            None
        }
        ServerEvent::SessionUpdated => Some(RealtimeEvent::SessionUpdated),
        ServerEvent::AudioDelta { delta } => Some(RealtimeEvent::AudioDelta(delta)),
        ServerEvent::SpeechStarted => Some(RealtimeEvent::SpeechStarted),
        ServerEvent::OutputItemDone { item } => match item.function_call_name() {
            Some(name) => Some(RealtimeEvent::FunctionCallDone {
                name: name.to_string(),
                arguments: item.arguments.clone().unwrap_or_default(),
            }),
            None => {
                tracing::debug!(item_type = %item.item_type, "output item done");
                None
            }
        },
        ServerEvent::InputTranscript { transcript } => {
            Some(RealtimeEvent::InputTranscript(transcript))
        }
        ServerEvent::OutputTranscript { transcript } => {
            Some(RealtimeEvent::OutputTranscript(transcript))
        }
        ServerEvent::ResponseDone => Some(RealtimeEvent::ResponseDone),
        ServerEvent::Error { error } => {
            tracing::error!(
                error_type = %error.error_type,
                "realtime backend error: {}",
                error.message
            );
            None
        }
        ServerEvent::Other => None,
    }
}

//! The bridge session state machine.
//!
//! One [`BridgeSession`] exists per media-stream connection. The WebSocket
//! handler owns it and feeds it events from both legs through a single
//! `select!` loop, so every handler below runs serialized; the struct needs
//! no interior locking.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::transcript::Transcript;
use crate::core::call_control::CallControl;
use crate::core::realtime::{RealtimeControl, RealtimeEvent, END_CALL_TOOL};
use crate::core::telephony::{TelephonyInbound, TelephonyOutbound};

/// Lifecycle of a bridge session.
///
/// `Connecting` until Twilio's `start` frame binds the stream and call
/// identifiers, `Active` while audio relays, `Ending` while the farewell
/// plays out, `Closed` once torn down. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Ending,
    Closed,
}

/// State for one bridged call.
pub struct BridgeSession {
    state: SessionState,
    stream_sid: Option<String>,
    call_sid: Option<String>,
    ai_speaking: bool,
    /// Latched on the first termination request so retries cannot double-end
    /// the call.
    end_call_requested: bool,
    transcript: Transcript,
    telephony_out: mpsc::Sender<TelephonyOutbound>,
    realtime: Arc<dyn RealtimeControl>,
    call_control: Arc<dyn CallControl>,
    closing_message: String,
}

impl BridgeSession {
    pub fn new(
        telephony_out: mpsc::Sender<TelephonyOutbound>,
        realtime: Arc<dyn RealtimeControl>,
        call_control: Arc<dyn CallControl>,
        closing_message: &str,
    ) -> Self {
        Self {
            state: SessionState::Connecting,
            stream_sid: None,
            call_sid: None,
            ai_speaking: false,
            end_call_requested: false,
            transcript: Transcript::new(),
            telephony_out,
            realtime,
            call_control,
            closing_message: closing_message.to_string(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn ai_speaking(&self) -> bool {
        self.ai_speaking
    }

    pub fn transcript_text(&self) -> String {
        self.transcript.render()
    }

    /// Process one frame from the telephony leg.
    pub async fn handle_telephony(&mut self, frame: TelephonyInbound) {
        if self.state == SessionState::Closed {
            return;
        }
        match frame {
            TelephonyInbound::Connected => {
                tracing::debug!("media stream connected");
            }
            TelephonyInbound::Start { start } => {
                tracing::info!(
                    stream_sid = %start.stream_sid,
                    call_sid = %start.call_sid,
                    "media stream started"
                );
                if !start.custom_parameters.is_empty() {
                    tracing::debug!(parameters = ?start.custom_parameters, "stream parameters");
                }
                self.stream_sid = Some(start.stream_sid);
                self.call_sid = Some(start.call_sid);
                self.state = SessionState::Active;
            }
            TelephonyInbound::Media { media } => match self.state {
                // Audio before `start` has no bound stream; drop it rather
                // than buffer frames whose call we cannot identify yet.
                SessionState::Connecting => {
                    tracing::debug!("dropping media frame received before start");
                }
                SessionState::Active | SessionState::Ending => {
                    self.realtime.append_audio(&media.payload).await;
                }
                SessionState::Closed => {}
            },
            TelephonyInbound::Stop => {
                tracing::info!("media stream stopped by telephony side");
                self.close("caller hung up").await;
            }
            TelephonyInbound::Mark | TelephonyInbound::Other => {}
        }
    }

    /// Process one event from the realtime leg.
    pub async fn handle_realtime(&mut self, event: RealtimeEvent) {
        if self.state == SessionState::Closed {
            return;
        }
        match event {
            RealtimeEvent::SessionUpdated => {
                tracing::debug!("realtime session configured");
            }
            RealtimeEvent::AudioDelta(payload) => {
                let stream_sid = match &self.stream_sid {
                    Some(sid) => sid.clone(),
                    // The greeting can start generating before Twilio sends
                    // `start`; without a stream id there is nowhere to play it.
                    None => {
                        tracing::debug!("dropping assistant audio before stream start");
                        return;
                    }
                };
                self.ai_speaking = true;
                self.send_telephony(TelephonyOutbound::media(&stream_sid, payload))
                    .await;
            }
            RealtimeEvent::SpeechStarted => {
                if self.ai_speaking {
                    self.interrupt_playback().await;
                }
            }
            RealtimeEvent::FunctionCallDone { name, arguments } => {
                if name == END_CALL_TOOL {
                    self.terminate().await;
                } else {
                    tracing::warn!(tool = %name, %arguments, "unknown tool call ignored");
                }
            }
            RealtimeEvent::InputTranscript(text) => {
                tracing::info!(role = "user", "transcript: {text}");
                self.transcript.add_user(&text);
            }
            RealtimeEvent::OutputTranscript(text) => {
                tracing::info!(role = "assistant", "transcript: {text}");
                self.transcript.add_assistant(&text);
            }
            RealtimeEvent::ResponseDone => {
                self.ai_speaking = false;
            }
            RealtimeEvent::Closed => {
                self.close("realtime leg closed").await;
            }
        }
    }

    /// Barge-in: flush queued playback on the caller's phone first, then
    /// cancel generation, so no stale audio arrives after the flush.
    async fn interrupt_playback(&mut self) {
        tracing::info!("caller barge-in, interrupting assistant");
        if let Some(sid) = self.stream_sid.clone() {
            self.send_telephony(TelephonyOutbound::clear(&sid)).await;
        }
        self.realtime.cancel_response().await;
        self.ai_speaking = false;
    }

    /// Wind down the call after the model invoked the end-call tool.
    ///
    /// Says the closing line, then completes the call over REST. A REST
    /// failure leaves the session active so the caller is not stranded
    /// mid-goodbye, but the latch stays set.
    async fn terminate(&mut self) {
        if self.end_call_requested {
            tracing::debug!("termination already requested, ignoring repeat tool call");
            return;
        }
        self.end_call_requested = true;

        let call_sid = match self.call_sid.clone() {
            Some(sid) => sid,
            None => {
                tracing::warn!("end-call tool invoked before stream start, ignoring");
                return;
            }
        };

        self.state = SessionState::Ending;
        self.realtime.create_item("user", &self.closing_message).await;
        self.realtime.create_response().await;

        match self.call_control.end_call(&call_sid).await {
            Ok(()) => {
                tracing::info!(call_sid = %call_sid, "assistant ended the call");
                self.close("ended by assistant").await;
            }
            Err(e) => {
                tracing::error!(call_sid = %call_sid, "failed to end call: {e}");
                self.state = SessionState::Active;
            }
        }
    }

    /// Tear the session down. Idempotent; later calls are no-ops.
    pub async fn close(&mut self, reason: &str) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.realtime.shutdown().await;
        if self.transcript.is_empty() {
            tracing::info!(reason, "session closed, no transcript");
        } else {
            tracing::info!(reason, "session closed\n{}", self.transcript.render());
        }
    }

    async fn send_telephony(&self, frame: TelephonyOutbound) {
        if self.telephony_out.send(frame).await.is_err() {
            tracing::debug!("telephony sender gone, dropping outbound frame");
        }
    }
}

//! Bridge session state-machine tests, driven through recording stubs for
//! both legs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use callbridge::core::bridge::{BridgeSession, SessionState};
use callbridge::core::call_control::CallControl;
use callbridge::core::realtime::{RealtimeControl, RealtimeEvent};
use callbridge::core::telephony::{TelephonyInbound, TelephonyOutbound};
use callbridge::errors::CallControlError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RealtimeOp {
    AppendAudio(String),
    CancelResponse,
    CreateItem { role: String, text: String },
    CreateResponse,
    Shutdown,
}

#[derive(Default)]
struct RecordingRealtime {
    ops: Mutex<Vec<RealtimeOp>>,
}

impl RecordingRealtime {
    async fn ops(&self) -> Vec<RealtimeOp> {
        self.ops.lock().await.clone()
    }
}

#[async_trait]
impl RealtimeControl for RecordingRealtime {
    fn is_open(&self) -> bool {
        true
    }

    async fn append_audio(&self, payload: &str) {
        self.ops
            .lock()
            .await
            .push(RealtimeOp::AppendAudio(payload.to_string()));
    }

    async fn cancel_response(&self) {
        self.ops.lock().await.push(RealtimeOp::CancelResponse);
    }

    async fn create_item(&self, role: &str, text: &str) {
        self.ops.lock().await.push(RealtimeOp::CreateItem {
            role: role.to_string(),
            text: text.to_string(),
        });
    }

    async fn create_response(&self) {
        self.ops.lock().await.push(RealtimeOp::CreateResponse);
    }

    async fn shutdown(&self) {
        self.ops.lock().await.push(RealtimeOp::Shutdown);
    }
}

struct StubCallControl {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StubCallControl {
    fn succeeding() -> Self {
        Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CallControl for StubCallControl {
    async fn end_call(&self, call_sid: &str) -> Result<(), CallControlError> {
        self.calls.lock().await.push(call_sid.to_string());
        if self.fail {
            Err(CallControlError::Rejected {
                status: 401,
                body: "authentication failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

struct Harness {
    session: BridgeSession,
    realtime: Arc<RecordingRealtime>,
    call_control: Arc<StubCallControl>,
    telephony_rx: mpsc::Receiver<TelephonyOutbound>,
}

fn harness_with(call_control: StubCallControl) -> Harness {
    let realtime = Arc::new(RecordingRealtime::default());
    let call_control = Arc::new(call_control);
    let (tx, rx) = mpsc::channel(64);
    let session = BridgeSession::new(
        tx,
        realtime.clone(),
        call_control.clone(),
        "Thank you for calling. Goodbye!",
    );
    Harness {
        session,
        realtime,
        call_control,
        telephony_rx: rx,
    }
}

fn harness() -> Harness {
    harness_with(StubCallControl::succeeding())
}

fn start_frame() -> TelephonyInbound {
    serde_json::from_str(
        r#"{"event":"start","start":{"streamSid":"MZ123","callSid":"CA456"}}"#,
    )
    .unwrap()
}

fn media_frame(payload: &str) -> TelephonyInbound {
    serde_json::from_str(&format!(
        r#"{{"event":"media","media":{{"payload":"{payload}"}}}}"#
    ))
    .unwrap()
}

fn drain(rx: &mut mpsc::Receiver<TelephonyOutbound>) -> Vec<TelephonyOutbound> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn media_before_start_is_dropped() {
    let mut h = harness();
    h.session.handle_telephony(media_frame("AAA=")).await;
    h.session.handle_telephony(start_frame()).await;
    h.session.handle_telephony(media_frame("BBB=")).await;

    let ops = h.realtime.ops().await;
    assert_eq!(ops, vec![RealtimeOp::AppendAudio("BBB=".to_string())]);
}

#[tokio::test]
async fn start_frame_activates_the_session() {
    let mut h = harness();
    assert_eq!(h.session.state(), SessionState::Connecting);
    h.session.handle_telephony(start_frame()).await;
    assert_eq!(h.session.state(), SessionState::Active);
}

#[tokio::test]
async fn assistant_audio_is_tagged_with_the_stream_sid() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::AudioDelta("BBB=".to_string()))
        .await;

    let frames = drain(&mut h.telephony_rx);
    assert_eq!(frames.len(), 1);
    let json = serde_json::to_value(&frames[0]).unwrap();
    assert_eq!(json["event"], "media");
    assert_eq!(json["streamSid"], "MZ123");
    assert_eq!(json["media"]["payload"], "BBB=");
    assert!(h.session.ai_speaking());
}

#[tokio::test]
async fn assistant_audio_before_start_is_dropped() {
    let mut h = harness();
    h.session
        .handle_realtime(RealtimeEvent::AudioDelta("BBB=".to_string()))
        .await;
    assert!(drain(&mut h.telephony_rx).is_empty());
}

#[tokio::test]
async fn barge_in_clears_playback_then_cancels_generation() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::AudioDelta("BBB=".to_string()))
        .await;
    h.session.handle_realtime(RealtimeEvent::SpeechStarted).await;

    let frames = drain(&mut h.telephony_rx);
    assert_eq!(frames.len(), 2);
    let clear = serde_json::to_value(&frames[1]).unwrap();
    assert_eq!(clear["event"], "clear");
    assert_eq!(clear["streamSid"], "MZ123");

    let ops = h.realtime.ops().await;
    assert_eq!(ops, vec![RealtimeOp::CancelResponse]);
    assert!(!h.session.ai_speaking());
}

#[tokio::test]
async fn speech_started_without_assistant_audio_does_nothing() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session.handle_realtime(RealtimeEvent::SpeechStarted).await;

    assert!(drain(&mut h.telephony_rx).is_empty());
    assert!(h.realtime.ops().await.is_empty());
}

#[tokio::test]
async fn repeated_barge_in_interrupts_once_per_utterance() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::AudioDelta("BBB=".to_string()))
        .await;
    h.session.handle_realtime(RealtimeEvent::SpeechStarted).await;
    h.session.handle_realtime(RealtimeEvent::SpeechStarted).await;

    let cancels = h
        .realtime
        .ops()
        .await
        .into_iter()
        .filter(|op| *op == RealtimeOp::CancelResponse)
        .count();
    assert_eq!(cancels, 1);
}

#[tokio::test]
async fn end_call_tool_says_goodbye_then_completes_the_call() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::FunctionCallDone {
            name: "end_call".to_string(),
            arguments: "{}".to_string(),
        })
        .await;

    assert_eq!(h.call_control.calls().await, vec!["CA456".to_string()]);
    let ops = h.realtime.ops().await;
    assert_eq!(
        ops,
        vec![
            RealtimeOp::CreateItem {
                role: "user".to_string(),
                text: "Thank you for calling. Goodbye!".to_string(),
            },
            RealtimeOp::CreateResponse,
            RealtimeOp::Shutdown,
        ]
    );
    assert_eq!(h.session.state(), SessionState::Closed);
}

#[tokio::test]
async fn repeated_end_call_tool_terminates_at_most_once() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    for _ in 0..3 {
        h.session
            .handle_realtime(RealtimeEvent::FunctionCallDone {
                name: "end_call".to_string(),
                arguments: "{}".to_string(),
            })
            .await;
    }
    assert_eq!(h.call_control.calls().await.len(), 1);
}

#[tokio::test]
async fn unknown_tool_calls_are_ignored() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::FunctionCallDone {
            name: "transfer_call".to_string(),
            arguments: "{}".to_string(),
        })
        .await;
    assert!(h.call_control.calls().await.is_empty());
    assert_eq!(h.session.state(), SessionState::Active);
}

#[tokio::test]
async fn failed_termination_keeps_the_session_alive_but_latched() {
    let mut h = harness_with(StubCallControl::failing());
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::FunctionCallDone {
            name: "end_call".to_string(),
            arguments: "{}".to_string(),
        })
        .await;

    // REST rejection: the caller is still on the line.
    assert_eq!(h.session.state(), SessionState::Active);
    assert_eq!(h.call_control.calls().await.len(), 1);

    // A repeat tool call must not retry the REST request.
    h.session
        .handle_realtime(RealtimeEvent::FunctionCallDone {
            name: "end_call".to_string(),
            arguments: "{}".to_string(),
        })
        .await;
    assert_eq!(h.call_control.calls().await.len(), 1);

    // Audio keeps flowing while the session stays up.
    h.session.handle_telephony(media_frame("CCC=")).await;
    let ops = h.realtime.ops().await;
    assert!(ops.contains(&RealtimeOp::AppendAudio("CCC=".to_string())));
}

#[tokio::test]
async fn transcript_accumulates_in_order() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_realtime(RealtimeEvent::InputTranscript("hello\n".to_string()))
        .await;
    h.session
        .handle_realtime(RealtimeEvent::OutputTranscript("hi there".to_string()))
        .await;
    h.session
        .handle_realtime(RealtimeEvent::InputTranscript("bye\n".to_string()))
        .await;

    assert_eq!(
        h.session.transcript_text(),
        "user: hello\nassistant: hi there\nuser: bye\n"
    );
}

#[tokio::test]
async fn stop_frame_closes_the_session() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session
        .handle_telephony(serde_json::from_str(r#"{"event":"stop"}"#).unwrap())
        .await;
    assert!(h.session.is_closed());
    assert_eq!(h.realtime.ops().await, vec![RealtimeOp::Shutdown]);
}

#[tokio::test]
async fn close_is_idempotent() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session.close("test").await;
    h.session.close("test again").await;

    let shutdowns = h
        .realtime
        .ops()
        .await
        .into_iter()
        .filter(|op| *op == RealtimeOp::Shutdown)
        .count();
    assert_eq!(shutdowns, 1);
}

#[tokio::test]
async fn events_after_close_are_ignored() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session.close("test").await;

    h.session.handle_telephony(media_frame("AAA=")).await;
    h.session
        .handle_realtime(RealtimeEvent::AudioDelta("BBB=".to_string()))
        .await;
    h.session
        .handle_realtime(RealtimeEvent::FunctionCallDone {
            name: "end_call".to_string(),
            arguments: "{}".to_string(),
        })
        .await;

    assert!(drain(&mut h.telephony_rx).is_empty());
    assert!(h.call_control.calls().await.is_empty());
    assert_eq!(h.realtime.ops().await, vec![RealtimeOp::Shutdown]);
}

#[tokio::test]
async fn realtime_leg_closing_tears_the_session_down() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session.handle_realtime(RealtimeEvent::Closed).await;
    assert!(h.session.is_closed());
}

#[tokio::test]
async fn full_exchange_relays_audio_both_ways() {
    let mut h = harness();
    h.session.handle_telephony(start_frame()).await;
    h.session.handle_telephony(media_frame("AAA=")).await;
    h.session
        .handle_realtime(RealtimeEvent::AudioDelta("BBB=".to_string()))
        .await;
    h.session.handle_realtime(RealtimeEvent::ResponseDone).await;

    assert_eq!(
        h.realtime.ops().await,
        vec![RealtimeOp::AppendAudio("AAA=".to_string())]
    );
    let frames = drain(&mut h.telephony_rx);
    assert_eq!(frames.len(), 1);
    assert!(!h.session.ai_speaking());
}

//! The media-stream WebSocket handler.
//!
//! Accepts Twilio's stream connection, dials the realtime leg, then drives
//! one [`BridgeSession`] from a single `select!` loop over both legs. A
//! dedicated sender task serializes outbound frames so the loop never blocks
//! on the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::bridge::BridgeSession;
use crate::core::call_control::CallControl;
use crate::core::realtime::{ConversationLink, RealtimeControl};
use crate::core::telephony::{TelephonyInbound, TelephonyOutbound};
use crate::state::AppState;

const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// GET /media (WebSocket upgrade)
pub async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("bridge_session", %session_id);
    run_stream(socket, state).instrument(span).await;
}

async fn run_stream(socket: WebSocket, state: AppState) {
    tracing::info!("media stream connection accepted");

    let (realtime_handle, mut realtime_events) =
        match ConversationLink::connect(&state.config.realtime_config()).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("could not open realtime leg: {e}");
                return;
            }
        };

    let (mut ws_sink, mut ws_source) = socket.split();
    let (telephony_tx, mut telephony_rx) =
        mpsc::channel::<TelephonyOutbound>(OUTBOUND_CHANNEL_CAPACITY);

    let sender = tokio::spawn(async move {
        while let Some(frame) = telephony_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to serialize telephony frame: {e}");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sink.send(Message::Close(None)).await;
    });

    let realtime: Arc<dyn RealtimeControl> = Arc::new(realtime_handle);
    let call_control: Arc<dyn CallControl> = state.call_control.clone();
    let mut session = BridgeSession::new(
        telephony_tx,
        realtime,
        call_control,
        &state.config.closing_message,
    );

    loop {
        tokio::select! {
            message = ws_source.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<TelephonyInbound>(&text) {
                        Ok(frame) => session.handle_telephony(frame).await,
                        Err(e) => {
                            tracing::warn!("unparseable telephony frame, ignoring: {e}");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    session.close("telephony socket closed").await;
                }
                Some(Err(e)) => {
                    tracing::warn!("telephony socket error: {e}");
                    session.close("telephony socket error").await;
                }
                Some(Ok(_)) => {}
            },
            event = realtime_events.recv() => match event {
                Some(event) => session.handle_realtime(event).await,
                None => session.close("realtime event stream ended").await,
            },
        }
        if session.is_closed() {
            break;
        }
    }

    // Dropping the session drops the outbound channel, which lets the
    // sender task flush and close the socket.
    drop(session);
    let _ = sender.await;
    tracing::info!("media stream connection finished");
}

//! HTTP handlers: health, the Twilio voice webhook, and outbound call
//! origination.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::call_control::{connect_stream_twiml, StreamParameter};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /incoming-call
///
/// Twilio voice webhook. Answers with TwiML that connects the call to the
/// media-stream endpoint on this server.
pub async fn incoming_call(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let domain = public_domain(&state, &headers)?;
    tracing::info!(%domain, "incoming call, answering with stream TwiML");
    let twiml = connect_stream_twiml(&domain, &[]);
    Ok(([(header::CONTENT_TYPE, "text/xml")], twiml).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct OutgoingCallRequest {
    /// Destination number; falls back to the configured default.
    pub to: Option<String>,
    /// Custom parameters echoed back on the media stream's `start` frame.
    #[serde(default)]
    pub parameters: Vec<StreamParameter>,
}

#[derive(Debug, Serialize)]
pub struct OutgoingCallResponse {
    pub call_sid: String,
}

/// POST /outgoing-call
///
/// Originate an outbound call. When answered, the call runs the same
/// stream TwiML as the inbound webhook.
pub async fn outgoing_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<OutgoingCallRequest>>,
) -> Result<Json<OutgoingCallResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let to = request
        .to
        .or_else(|| state.config.default_to_number.clone())
        .ok_or(AppError::NotConfigured("TO_PHONE_NUMBER"))?;
    let from = state
        .config
        .from_number
        .clone()
        .ok_or(AppError::NotConfigured("FROM_PHONE_NUMBER"))?;
    let domain = public_domain(&state, &headers)?;

    let twiml = connect_stream_twiml(&domain, &request.parameters);
    let call_sid = state.call_control.create_call(&to, &from, &twiml).await?;
    tracing::info!(%call_sid, %to, "outbound call created");
    Ok(Json(OutgoingCallResponse { call_sid }))
}

/// The hostname Twilio should open the media stream against: the configured
/// public domain, or the Host header when running behind a tunnel.
fn public_domain(state: &AppState, headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(domain) = &state.config.public_domain {
        return Ok(domain.clone());
    }
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(AppError::NotConfigured("PUBLIC_DOMAIN"))
}

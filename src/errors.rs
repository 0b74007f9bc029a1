//! Error types for the callbridge server.
//!
//! Errors are scoped per concern; no failure in a single call session is
//! fatal to the process. Handlers convert errors into JSON responses via
//! [`AppError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided by any source.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting was provided but its value is not usable.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors on the realtime (AI) WebSocket leg.
///
/// Only connecting can fail loudly; once the link is up, outbound
/// operations to a closed link are silently dropped (`is_open` guard).
#[derive(Debug, Error)]
pub enum LinkError {
    /// The WebSocket handshake with the realtime backend failed.
    #[error("realtime connection failed: {0}")]
    Connect(String),
}

/// Errors from the telephony call-control REST API.
#[derive(Debug, Error)]
pub enum CallControlError {
    /// Transport-level failure talking to the API.
    #[error("call control request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("call control rejected the request: status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("call control returned an unexpected response: {0}")]
    Malformed(String),
}

/// Top-level handler error, converted into an HTTP response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    CallControl(#[from] CallControlError),

    /// The server is missing configuration needed to serve this route.
    #[error("server is not configured for this operation: {0}")]
    NotConfigured(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::CallControl(_) => StatusCode::BAD_GATEWAY,
            AppError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

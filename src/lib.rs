//! Callbridge joins two call legs: a Twilio media-stream WebSocket carrying
//! the caller's audio, and an OpenAI Realtime API WebSocket running the
//! conversation. Audio relays opaquely in both directions; the bridge adds
//! barge-in interruption, assistant-initiated call termination through an
//! `end_call` tool, and a running transcript.

pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;

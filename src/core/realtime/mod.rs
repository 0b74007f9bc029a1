//! Realtime AI leg: configuration, wire protocol, and the WebSocket link.

pub mod config;
pub mod link;
pub mod messages;

pub use config::{AudioFormat, RealtimeConfig, RealtimeModel, RealtimeVoice, END_CALL_TOOL};
pub use link::{ConversationHandle, ConversationLink, RealtimeControl, RealtimeEvent};

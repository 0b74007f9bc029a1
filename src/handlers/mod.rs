//! HTTP and WebSocket request handlers.

pub mod calls;
pub mod media;

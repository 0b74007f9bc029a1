//! Telephony leg: Twilio media-stream wire events.

pub mod messages;

pub use messages::{MediaFrame, MediaPayload, StreamStart, TelephonyInbound, TelephonyOutbound};

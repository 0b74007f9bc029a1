//! Twilio media-stream wire events.
//!
//! Twilio tags frames with an `event` field and camelCase keys. Inbound
//! frames the bridge does not act on fall into [`TelephonyInbound::Other`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Events received from the Twilio media stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum TelephonyInbound {
    /// First frame after the WebSocket upgrade.
    #[serde(rename = "connected")]
    Connected,

    /// Stream metadata; binds the stream and call identifiers.
    #[serde(rename = "start")]
    Start { start: StreamStart },

    /// A chunk of caller audio.
    #[serde(rename = "media")]
    Media { media: MediaFrame },

    /// The stream ended (caller hung up or the call was completed).
    #[serde(rename = "stop")]
    Stop,

    /// Acknowledgement of a mark frame. The bridge sends no marks.
    #[serde(rename = "mark")]
    Mark,

    /// Any event the bridge does not consume.
    #[serde(other)]
    Other,
}

/// Payload of the `start` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "callSid")]
    pub call_sid: String,
    /// Parameters set on the `<Stream>` TwiML element, echoed back here.
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
}

/// Payload of a `media` frame: base64 audio in the stream's encoding.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFrame {
    pub payload: String,
}

/// Frames sent to the Twilio media stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TelephonyOutbound {
    /// A chunk of assistant audio for playback to the caller.
    #[serde(rename = "media")]
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },

    /// Flush Twilio's playback buffer (barge-in).
    #[serde(rename = "clear")]
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl TelephonyOutbound {
    /// A media frame carrying the given base64 payload.
    pub fn media(stream_sid: &str, payload: String) -> Self {
        Self::Media {
            stream_sid: stream_sid.to_string(),
            media: MediaPayload { payload },
        }
    }

    /// A clear frame for the given stream.
    pub fn clear(stream_sid: &str) -> Self {
        Self::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }
}

/// Audio payload of an outbound media frame.
#[derive(Debug, Clone, Serialize)]
pub struct MediaPayload {
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_frame_binds_identifiers() {
        let frame: TelephonyInbound = serde_json::from_str(
            r#"{"event":"start","sequenceNumber":"1",
                "start":{"streamSid":"MZ123","callSid":"CA456","accountSid":"AC789",
                         "tracks":["inbound"],"mediaFormat":{"encoding":"audio/x-mulaw"}}}"#,
        )
        .unwrap();
        match frame {
            TelephonyInbound::Start { start } => {
                assert_eq!(start.stream_sid, "MZ123");
                assert_eq!(start.call_sid, "CA456");
                assert!(start.custom_parameters.is_empty());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn media_frame_carries_payload() {
        let frame: TelephonyInbound = serde_json::from_str(
            r#"{"event":"media","sequenceNumber":"4",
                "media":{"track":"inbound","chunk":"2","timestamp":"5","payload":"AAA="}}"#,
        )
        .unwrap();
        match frame {
            TelephonyInbound::Media { media } => assert_eq!(media.payload, "AAA="),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn start_frame_carries_custom_parameters() {
        let frame: TelephonyInbound = serde_json::from_str(
            r#"{"event":"start",
                "start":{"streamSid":"MZ123","callSid":"CA456",
                         "customParameters":{"customerId":"123"}}}"#,
        )
        .unwrap();
        match frame {
            TelephonyInbound::Start { start } => {
                assert_eq!(start.custom_parameters["customerId"], "123");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_events_fall_into_other() {
        let frame: TelephonyInbound =
            serde_json::from_str(r#"{"event":"dtmf","dtmf":{"digit":"5"}}"#).unwrap();
        assert!(matches!(frame, TelephonyInbound::Other));
    }

    #[test]
    fn outbound_media_uses_camel_case_stream_sid() {
        let json =
            serde_json::to_value(TelephonyOutbound::media("MZ123", "BBB=".to_string())).unwrap();
        assert_eq!(json["event"], "media");
        assert_eq!(json["streamSid"], "MZ123");
        assert_eq!(json["media"]["payload"], "BBB=");
    }

    #[test]
    fn outbound_clear_shape() {
        let json = serde_json::to_string(&TelephonyOutbound::clear("MZ123")).unwrap();
        assert_eq!(json, r#"{"event":"clear","streamSid":"MZ123"}"#);
    }
}

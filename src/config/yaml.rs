//! YAML configuration file loading.
//!
//! Every field is optional; values present in the file override the
//! corresponding environment variables.

use serde::Deserialize;
use std::path::Path;

use crate::errors::ConfigError;

/// On-disk configuration schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    /// Server section.
    #[serde(default)]
    pub server: ServerSection,
    /// Twilio section.
    #[serde(default)]
    pub twilio: TwilioSection,
    /// Realtime AI section.
    #[serde(default)]
    pub realtime: RealtimeSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Public hostname used to build the media-stream WebSocket URL in TwiML.
    pub public_domain: Option<String>,
    pub cors_allowed_origins: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwilioSection {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    /// Default destination for outbound calls when the request omits one.
    pub default_to_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
    pub instructions: Option<String>,
    /// Instruction used for the assistant's opening line.
    pub greeting: Option<String>,
    /// Text spoken by the assistant right before the call is terminated.
    pub closing_message: Option<String>,
}

impl YamlConfig {
    /// Load and parse a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

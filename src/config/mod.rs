//! Server configuration.
//!
//! Configuration is assembled from three sources with the priority
//! YAML file > environment variables > defaults. A `.env` file, when
//! present, is loaded into the environment before this module runs
//! (see `main.rs`).

use std::env;
use std::path::Path;

mod yaml;

pub use yaml::YamlConfig;

use crate::core::realtime::{RealtimeConfig, RealtimeModel, RealtimeVoice};
use crate::errors::ConfigError;

/// Default system instructions for the assistant.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful and friendly AI phone operator. \
Answer the caller's questions accurately and concisely, acknowledge their concerns, and \
keep a positive tone. You have access to a tool called \"end_call\"; use it whenever the \
caller indicates the conversation is over or asks to hang up.";

/// Default instruction for the assistant's opening line.
pub const DEFAULT_GREETING: &str = "Greet the caller warmly and ask how you can help.";

/// Default text spoken right before the call is terminated.
pub const DEFAULT_CLOSING_MESSAGE: &str = "Thank you for calling. Goodbye!";

/// Runtime configuration for the callbridge server.
///
/// Carries the HTTP/WebSocket listener settings, the Twilio REST
/// credentials used by call control, and the realtime AI session
/// parameters injected into every bridge session.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public hostname (no scheme) used to build the `wss://{domain}/media`
    /// stream URL handed to Twilio in TwiML.
    pub public_domain: Option<String>,
    pub cors_allowed_origins: Option<String>,

    // Twilio settings
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub from_number: Option<String>,
    pub default_to_number: Option<String>,

    // Realtime AI settings
    pub openai_api_key: String,
    pub realtime_model: RealtimeModel,
    pub realtime_voice: RealtimeVoice,
    pub temperature: f32,
    pub instructions: String,
    pub greeting: String,
    pub closing_message: String,
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(YamlConfig::default())
    }

    /// Load configuration from a YAML file, with environment variables
    /// filling any gaps.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(YamlConfig::load(path)?)
    }

    fn build(overlay: YamlConfig) -> Result<Self, ConfigError> {
        let host = overlay
            .server
            .host
            .or_else(|| env_var("HOST"))
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match overlay.server.port {
            Some(p) => p,
            None => match env_var("PORT") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    name: "PORT",
                    reason: format!("not a valid port number: {raw}"),
                })?,
                None => 3000,
            },
        };

        let temperature = match overlay.realtime.temperature {
            Some(t) => t,
            None => match env_var("REALTIME_TEMPERATURE") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    name: "REALTIME_TEMPERATURE",
                    reason: format!("not a number: {raw}"),
                })?,
                None => 0.6,
            },
        };

        let config = Self {
            host,
            port,
            public_domain: overlay
                .server
                .public_domain
                .or_else(|| env_var("PUBLIC_DOMAIN")),
            cors_allowed_origins: overlay
                .server
                .cors_allowed_origins
                .or_else(|| env_var("CORS_ALLOWED_ORIGINS")),
            twilio_account_sid: overlay
                .twilio
                .account_sid
                .or_else(|| env_var("TWILIO_ACCOUNT_SID"))
                .ok_or(ConfigError::Missing("TWILIO_ACCOUNT_SID"))?,
            twilio_auth_token: overlay
                .twilio
                .auth_token
                .or_else(|| env_var("TWILIO_AUTH_TOKEN"))
                .ok_or(ConfigError::Missing("TWILIO_AUTH_TOKEN"))?,
            from_number: overlay
                .twilio
                .from_number
                .or_else(|| env_var("FROM_PHONE_NUMBER")),
            default_to_number: overlay
                .twilio
                .default_to_number
                .or_else(|| env_var("TO_PHONE_NUMBER")),
            openai_api_key: overlay
                .realtime
                .api_key
                .or_else(|| env_var("OPENAI_API_KEY"))
                .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            realtime_model: RealtimeModel::from_str_or_default(
                overlay
                    .realtime
                    .model
                    .or_else(|| env_var("REALTIME_MODEL"))
                    .as_deref()
                    .unwrap_or(""),
            ),
            realtime_voice: RealtimeVoice::from_str_or_default(
                overlay
                    .realtime
                    .voice
                    .or_else(|| env_var("REALTIME_VOICE"))
                    .as_deref()
                    .unwrap_or(""),
            ),
            temperature,
            instructions: overlay
                .realtime
                .instructions
                .or_else(|| env_var("SYSTEM_INSTRUCTIONS"))
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            greeting: overlay
                .realtime
                .greeting
                .or_else(|| env_var("GREETING_INSTRUCTIONS"))
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            closing_message: overlay
                .realtime
                .closing_message
                .or_else(|| env_var("CLOSING_MESSAGE"))
                .unwrap_or_else(|| DEFAULT_CLOSING_MESSAGE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                name: "PORT",
                reason: "port 0 is not a usable listener port".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid {
                name: "REALTIME_TEMPERATURE",
                reason: format!("{} is outside the accepted range 0.0..=2.0", self.temperature),
            });
        }
        if let Some(domain) = &self.public_domain {
            if domain.contains("://") {
                return Err(ConfigError::Invalid {
                    name: "PUBLIC_DOMAIN",
                    reason: "expected a bare hostname without a scheme".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Listener address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Realtime session parameters for a new bridge session.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.openai_api_key.clone(),
            model: self.realtime_model,
            voice: self.realtime_voice,
            temperature: self.temperature,
            instructions: self.instructions.clone(),
            greeting: self.greeting.clone(),
            ..RealtimeConfig::default()
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

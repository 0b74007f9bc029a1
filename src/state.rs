//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::call_control::TwilioCallControl;

/// Dependencies shared across requests. Cheap to clone; everything inside
/// is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub call_control: Arc<TwilioCallControl>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let call_control = Arc::new(TwilioCallControl::new(
            &config.twilio_account_sid,
            &config.twilio_auth_token,
        ));
        Self {
            config: Arc::new(config),
            call_control,
        }
    }
}

//! Call lifecycle operations against the Twilio REST API.
//!
//! The bridge session only ever terminates calls, so the trait seam is that
//! single operation; call origination and TwiML generation are HTTP-handler
//! concerns and live on the concrete client.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::CallControlError;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Terminates live calls. Implemented by [`TwilioCallControl`] in production
/// and by recording stubs in session tests.
#[async_trait]
pub trait CallControl: Send + Sync {
    /// End the call with the given SID by marking it completed.
    async fn end_call(&self, call_sid: &str) -> Result<(), CallControlError>;
}

/// Twilio REST API client.
#[derive(Debug, Clone)]
pub struct TwilioCallControl {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

impl TwilioCallControl {
    pub fn new(account_sid: &str, auth_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: TWILIO_API_BASE.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        }
    }

    /// Point the client at a different API host. Test-only escape hatch.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn calls_url(&self, suffix: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls{}.json",
            self.api_base, self.account_sid, suffix
        )
    }

    /// Originate an outbound call that runs the given TwiML when answered.
    /// Returns the new call SID.
    pub async fn create_call(
        &self,
        to: &str,
        from: &str,
        twiml: &str,
    ) -> Result<String, CallControlError> {
        let response = self
            .http
            .post(self.calls_url(""))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Twiml", twiml)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallControlError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let resource: CallResource = response
            .json()
            .await
            .map_err(|e| CallControlError::Malformed(e.to_string()))?;
        Ok(resource.sid)
    }
}

#[async_trait]
impl CallControl for TwilioCallControl {
    async fn end_call(&self, call_sid: &str) -> Result<(), CallControlError> {
        let response = self
            .http
            .post(self.calls_url(&format!("/{call_sid}")))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(call_sid, "call terminated");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(CallControlError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// A custom key/value pair carried on the media stream; Twilio echoes these
/// back in the `start` frame's `customParameters`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParameter {
    pub name: String,
    pub value: String,
}

/// TwiML that connects the answered call to the media-stream endpoint.
pub fn connect_stream_twiml(public_domain: &str, parameters: &[StreamParameter]) -> String {
    let url = format!("wss://{}/media", escape_xml(public_domain));
    if parameters.is_empty() {
        return format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect><Stream url="{url}" /></Connect></Response>"#
        );
    }
    let mut params = String::new();
    for p in parameters {
        params.push_str(&format!(
            r#"<Parameter name="{}" value="{}" />"#,
            escape_xml(&p.name),
            escape_xml(&p.value)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect><Stream url="{url}">{params}</Stream></Connect></Response>"#
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

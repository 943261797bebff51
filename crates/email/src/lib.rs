//! `lectern-email` — notification sink implementations.
//!
//! Challenge codes go out through a SendGrid-style HTTP mail API when a
//! delivery credential is configured, and are logged instead when it is not
//! (so the login flow stays usable in development).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use lectern_auth::{NotificationSink, SinkError};

const DEFAULT_MAIL_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Logs the challenge code instead of delivering it.
#[derive(Debug, Default)]
pub struct DebugMailer;

#[async_trait]
impl NotificationSink for DebugMailer {
    async fn send_challenge_code(&self, email: &str, code: &str) -> Result<(), SinkError> {
        tracing::info!(%email, %code, "debug mailer: challenge code");
        Ok(())
    }
}

/// Delivers challenge codes through an HTTP mail API.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_MAIL_ENDPOINT.to_string(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    /// Override the API endpoint (useful against a local mail catcher).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl NotificationSink for HttpMailer {
    async fn send_challenge_code(&self, email: &str, code: &str) -> Result<(), SinkError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": email }] }],
            "from": { "email": self.from },
            "subject": "Login token",
            "content": [{
                "type": "text/plain",
                "value": format!("The login token for the API is: {code}"),
            }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SinkError::delivery(format!(
                "mail API returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Pick a mailer from the environment: `MAIL_API_KEY` + `MAIL_FROM` select
/// the HTTP mailer, otherwise challenge codes are logged.
pub fn from_env() -> Arc<dyn NotificationSink> {
    match (std::env::var("MAIL_API_KEY"), std::env::var("MAIL_FROM")) {
        (Ok(api_key), Ok(from)) => Arc::new(HttpMailer::new(api_key, from)),
        _ => {
            tracing::warn!(
                "MAIL_API_KEY/MAIL_FROM not set; logging challenge codes instead of emailing them"
            );
            Arc::new(DebugMailer)
        }
    }
}

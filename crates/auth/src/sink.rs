//! Notification sink port (consumed interface).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("challenge delivery failed: {0}")]
    Delivery(String),
}

impl SinkError {
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}

/// Delivers the email challenge code to the user out-of-band.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_challenge_code(&self, email: &str, code: &str) -> Result<(), SinkError>;
}

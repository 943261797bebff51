//! Authentication configuration, injected at boot.

use chrono::Duration;
use jsonwebtoken::Algorithm;

/// Development fallback signing secret.
///
/// Unfit for production: anyone holding this string can mint valid bearer
/// credentials. Boot logs a warning whenever it is in use.
pub const DEV_FALLBACK_SECRET: &str = "lectern-insecure-dev-secret";

/// Email challenges live for ten minutes.
pub const CHALLENGE_EXPIRATION_MINUTES: i64 = 10;

/// API sessions live for twelve hours.
pub const SESSION_EXPIRATION_HOURS: i64 = 12;

/// Process-wide authentication configuration.
///
/// There are no hidden globals: construct one of these at startup and hand it
/// to [`crate::AuthFlow`] / [`crate::AuthGate`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub challenge_ttl: Duration,
    pub session_ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            challenge_ttl: Duration::minutes(CHALLENGE_EXPIRATION_MINUTES),
            session_ttl: Duration::hours(SESSION_EXPIRATION_HOURS),
        }
    }

    /// Read the signing secret from `JWT_SECRET`, falling back to the
    /// insecure development default with a warning.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_FALLBACK_SECRET.to_string()
        });
        Self::new(secret)
    }
}

//! Two-phase passwordless login: issue an email challenge, then redeem it
//! for an API session.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::codec::{generate_challenge_code, CredentialCodec};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::sink::NotificationSink;
use crate::store::TokenStore;
use crate::token::NewToken;

/// Orchestrates the login/authenticate phases.
///
/// Stateless beyond its injected collaborators; every call is a short-lived
/// request/response unit.
pub struct AuthFlow {
    store: Arc<dyn TokenStore>,
    sink: Arc<dyn NotificationSink>,
    codec: CredentialCodec,
    challenge_ttl: Duration,
    session_ttl: Duration,
}

impl AuthFlow {
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn TokenStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            sink,
            codec: CredentialCodec::new(config),
            challenge_ttl: config.challenge_ttl,
            session_ttl: config.session_ttl,
        }
    }

    /// Phase 1: issue an email challenge for `email`.
    ///
    /// The owning user is created implicitly on first login. The response
    /// shape is identical whether or not the user already existed, so this
    /// endpoint cannot be used to enumerate accounts.
    pub async fn login(&self, email: &str) -> Result<(), AuthError> {
        let code = generate_challenge_code();
        let expires_at = Utc::now() + self.challenge_ttl;

        let user_id = self
            .store
            .upsert_user_by_email(email)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "login: user upsert failed");
                AuthError::Internal
            })?;

        self.store
            .create_token(NewToken::email_challenge(code.as_str(), expires_at, user_id))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "login: challenge creation failed");
                AuthError::Internal
            })?;

        self.sink
            .send_challenge_code(email, &code)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "login: challenge delivery failed");
                AuthError::Internal
            })?;

        Ok(())
    }

    /// Phase 2: redeem an email challenge for a bearer credential.
    ///
    /// Redemption is single-use: the challenge is invalidated in the same
    /// atomic store operation that creates the session, so a second call
    /// with the same code fails.
    pub async fn authenticate(&self, email: &str, challenge_code: &str) -> Result<String, AuthError> {
        let found = self
            .store
            .find_token_by_challenge_code(challenge_code)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "authenticate: challenge lookup failed");
                AuthError::Unauthorized("DB Error")
            })?;

        let Some(challenge) = found else {
            return Err(AuthError::Unauthorized("invalid token"));
        };
        if !challenge.token.valid {
            return Err(AuthError::Unauthorized("invalid token"));
        }
        if challenge.token.is_expired(Utc::now()) {
            return Err(AuthError::Unauthorized("token expired"));
        }
        // Ownership check is case-sensitive: the challenge only proves
        // control of the exact mailbox it was sent to.
        if challenge.owner_email != email {
            return Err(AuthError::Unauthorized("email mismatch"));
        }

        let session = NewToken::api_session(Utc::now() + self.session_ttl, challenge.token.user_id);
        let session = self
            .store
            .redeem_challenge(challenge.token.id, session)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "authenticate: redemption failed");
                AuthError::Unauthorized("DB Error")
            })?;

        self.codec.sign_session_token(session.id).map_err(|e| {
            tracing::error!(error = %e, "authenticate: session signing failed");
            AuthError::Internal
        })
    }
}

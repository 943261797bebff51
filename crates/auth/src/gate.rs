//! Authorization gate: bearer credential in, [`Principal`] out.

use std::sync::Arc;

use chrono::Utc;

use lectern_core::TokenId;

use crate::codec::CredentialCodec;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::principal::Principal;
use crate::store::TokenStore;

/// Resolves bearer credentials on every protected-route request.
///
/// Fail-closed: store failures during resolution degrade to `Unauthorized`
/// (detail goes to the log only), never to a 5xx from this layer.
pub struct AuthGate {
    store: Arc<dyn TokenStore>,
    codec: CredentialCodec,
}

impl AuthGate {
    pub fn new(config: &AuthConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            codec: CredentialCodec::new(config),
        }
    }

    pub async fn authorize(&self, credential: &str) -> Result<Principal, AuthError> {
        let raw_id = self.codec.verify_session_token(credential).map_err(|e| {
            tracing::error!(error = %e, "API token error");
            AuthError::Unauthorized("invalid credential")
        })?;

        if raw_id <= 0 {
            tracing::error!(token_id = raw_id, "API token error: non-positive token id");
            return Err(AuthError::Unauthorized("invalid credential"));
        }
        let token_id = TokenId::new(raw_id);

        let fetched = match self.store.find_token_by_id(token_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(error = %e, "authorize: token lookup failed");
                return Err(AuthError::Unauthorized("DB Error"));
            }
        };

        let Some(fetched) = fetched else {
            return Err(AuthError::Unauthorized("Invalid token"));
        };
        if !fetched.token.valid {
            return Err(AuthError::Unauthorized("Invalid token"));
        }
        // Read-time check only; expired tokens are not mutated or deleted.
        if fetched.token.is_expired(Utc::now()) {
            return Err(AuthError::Unauthorized("Token Expired"));
        }

        let teacher_of = match self.store.find_teacher_course_ids(fetched.token.user_id).await {
            Ok(teacher_of) => teacher_of,
            Err(e) => {
                tracing::error!(error = %e, "authorize: teacher role lookup failed");
                return Err(AuthError::Unauthorized("DB Error"));
            }
        };

        Ok(Principal {
            token_id,
            user_id: fetched.token.user_id,
            is_admin: fetched.owner_is_admin,
            teacher_of,
        })
    }
}

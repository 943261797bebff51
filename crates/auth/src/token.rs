//! Token records: email challenges and API sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lectern_core::{TokenId, UserId};

/// What a token is for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    /// Short-lived challenge delivered by email to prove mailbox ownership.
    EmailChallenge,
    /// Longer-lived session backing an opaque bearer credential.
    ApiSession,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EmailChallenge => "EMAIL_CHALLENGE",
            TokenKind::ApiSession => "API_SESSION",
        }
    }
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored token.
///
/// `valid` starts true and is flipped to false exactly once when an email
/// challenge is redeemed; it is never reset. Expired tokens are rejected at
/// read time but never mutated or deleted (cleanup only happens through the
/// owning user's cascade delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenKind,
    /// Present only for [`TokenKind::EmailChallenge`]; an 8-digit decimal
    /// string, unique among valid challenges.
    pub challenge_code: Option<String>,
    pub valid: bool,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A token ready to be persisted (the store assigns the id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToken {
    pub kind: TokenKind,
    pub challenge_code: Option<String>,
    pub valid: bool,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl NewToken {
    pub fn email_challenge(code: impl Into<String>, expires_at: DateTime<Utc>, user_id: UserId) -> Self {
        Self {
            kind: TokenKind::EmailChallenge,
            challenge_code: Some(code.into()),
            valid: true,
            expires_at,
            user_id,
        }
    }

    pub fn api_session(expires_at: DateTime<Utc>, user_id: UserId) -> Self {
        Self {
            kind: TokenKind::ApiSession,
            challenge_code: None,
            valid: true,
            expires_at,
            user_id,
        }
    }
}

//! Token store port (consumed interface).
//!
//! The store is the only shared mutable resource in the system; all
//! concurrency control lives behind this trait. Implementations must make
//! [`TokenStore::redeem_challenge`] and [`TokenStore::delete_user_cascade`]
//! failure-atomic.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use lectern_core::{CourseId, TokenId, UserId};

use crate::token::{NewToken, Token};

/// Storage operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-value collision (e.g. a duplicate valid challenge code).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Anything the backend itself failed at (connection, lock, query).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A token joined with the fields of its owning user that the auth core
/// needs (challenge redemption compares emails; the gate reads the admin
/// flag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithOwner {
    pub token: Token,
    pub owner_email: String,
    pub owner_is_admin: bool,
}

/// Durable keyed storage for token records and their owning users.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a token; the store assigns the id.
    ///
    /// For email challenges the store must reject a `challenge_code` that
    /// collides with an existing *valid* challenge.
    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError>;

    async fn find_token_by_challenge_code(
        &self,
        code: &str,
    ) -> Result<Option<TokenWithOwner>, StoreError>;

    async fn find_token_by_id(&self, id: TokenId) -> Result<Option<TokenWithOwner>, StoreError>;

    async fn update_token_validity(&self, id: TokenId, valid: bool) -> Result<(), StoreError>;

    /// Create `session` and invalidate the challenge token `challenge_id`
    /// as one failure-atomic unit: the store must never end up holding a
    /// live session alongside a still-valid challenge from the same code.
    async fn redeem_challenge(
        &self,
        challenge_id: TokenId,
        session: NewToken,
    ) -> Result<Token, StoreError>;

    /// Course ids where the user holds a TEACHER enrollment.
    async fn find_teacher_course_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<CourseId>, StoreError>;

    /// Find a user by email, creating a bare record if absent.
    async fn upsert_user_by_email(&self, email: &str) -> Result<UserId, StoreError>;

    /// Delete the user's tokens and then the user, atomically.
    async fn delete_user_cascade(&self, user_id: UserId) -> Result<(), StoreError>;
}

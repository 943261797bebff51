//! Minimal in-memory test doubles for the store and sink ports.
//!
//! The real storage implementations live in `lectern-store`; these exist so
//! the flow and gate can be exercised without a crate cycle.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use lectern_core::{CourseId, TokenId, UserId};

use crate::sink::{NotificationSink, SinkError};
use crate::store::{StoreError, TokenStore, TokenWithOwner};
use crate::token::{NewToken, Token, TokenKind};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, (String, bool)>,
    tokens: HashMap<TokenId, Token>,
    teaching: HashMap<UserId, HashSet<CourseId>>,
    next_user_id: i64,
    next_token_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    state: Mutex<State>,
    fail_next: AtomicBool,
}

impl MemoryTokenStore {
    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn tokens_of_kind(&self, kind: TokenKind) -> Vec<Token> {
        let state = self.state.lock().unwrap();
        let mut tokens: Vec<Token> = state.tokens.values().filter(|t| t.kind == kind).cloned().collect();
        tokens.sort_by_key(|t| t.id);
        tokens
    }

    pub fn set_admin(&self, user_id: UserId, is_admin: bool) {
        if let Some(user) = self.state.lock().unwrap().users.get_mut(&user_id) {
            user.1 = is_admin;
        }
    }

    pub fn enroll_teacher(&self, user_id: UserId, course: CourseId) {
        self.state
            .lock()
            .unwrap()
            .teaching
            .entry(user_id)
            .or_default()
            .insert(course);
    }

    /// Make the next lookup fail with a backend error.
    pub fn fail_next_lookup(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(StoreError::backend("injected failure"))
        } else {
            Ok(())
        }
    }

    fn with_owner(state: &State, token: &Token) -> Option<TokenWithOwner> {
        let (email, is_admin) = state.users.get(&token.user_id)?;
        Some(TokenWithOwner {
            token: token.clone(),
            owner_email: email.clone(),
            owner_is_admin: *is_admin,
        })
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create_token(&self, token: NewToken) -> Result<Token, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(code) = &token.challenge_code {
            let duplicate = state
                .tokens
                .values()
                .any(|t| t.valid && t.challenge_code.as_deref() == Some(code));
            if duplicate {
                return Err(StoreError::conflict("duplicate challenge code"));
            }
        }
        state.next_token_id += 1;
        let stored = Token {
            id: TokenId::new(state.next_token_id),
            kind: token.kind,
            challenge_code: token.challenge_code,
            valid: token.valid,
            expires_at: token.expires_at,
            user_id: token.user_id,
            created_at: Utc::now(),
        };
        state.tokens.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_token_by_challenge_code(
        &self,
        code: &str,
    ) -> Result<Option<TokenWithOwner>, StoreError> {
        self.check_failure()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .tokens
            .values()
            .find(|t| t.challenge_code.as_deref() == Some(code))
            .and_then(|t| Self::with_owner(&state, t)))
    }

    async fn find_token_by_id(&self, id: TokenId) -> Result<Option<TokenWithOwner>, StoreError> {
        self.check_failure()?;
        let state = self.state.lock().unwrap();
        Ok(state.tokens.get(&id).and_then(|t| Self::with_owner(&state, t)))
    }

    async fn update_token_validity(&self, id: TokenId, valid: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let token = state.tokens.get_mut(&id).ok_or(StoreError::NotFound)?;
        token.valid = valid;
        Ok(())
    }

    async fn redeem_challenge(
        &self,
        challenge_id: TokenId,
        session: NewToken,
    ) -> Result<Token, StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.tokens.contains_key(&challenge_id) {
            return Err(StoreError::NotFound);
        }
        state.next_token_id += 1;
        let stored = Token {
            id: TokenId::new(state.next_token_id),
            kind: session.kind,
            challenge_code: session.challenge_code,
            valid: session.valid,
            expires_at: session.expires_at,
            user_id: session.user_id,
            created_at: Utc::now(),
        };
        state.tokens.insert(stored.id, stored.clone());
        state
            .tokens
            .get_mut(&challenge_id)
            .expect("checked above")
            .valid = false;
        Ok(stored)
    }

    async fn find_teacher_course_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<CourseId>, StoreError> {
        self.check_failure()?;
        let state = self.state.lock().unwrap();
        Ok(state.teaching.get(&user_id).cloned().unwrap_or_default())
    }

    async fn upsert_user_by_email(&self, email: &str) -> Result<UserId, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some((id, _)) = state.users.iter().find(|(_, (e, _))| e == email) {
            return Ok(*id);
        }
        state.next_user_id += 1;
        let id = UserId::new(state.next_user_id);
        state.users.insert(id, (email.to_string(), false));
        Ok(id)
    }

    async fn delete_user_cascade(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.users.remove(&user_id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.tokens.retain(|_, t| t.user_id != user_id);
        state.teaching.remove(&user_id);
        Ok(())
    }
}

/// Captures challenge codes instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_challenge_code(&self, email: &str, code: &str) -> Result<(), SinkError> {
        self.sent.lock().unwrap().push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Always fails delivery.
#[derive(Debug)]
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn send_challenge_code(&self, _email: &str, _code: &str) -> Result<(), SinkError> {
        Err(SinkError::delivery("sink unavailable"))
    }
}

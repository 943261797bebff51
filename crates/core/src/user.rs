//! User record, the anchor for token ownership and role lookups.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::UserId;

/// A stored user.
///
/// `email` is unique and compared case-sensitively everywhere (token
/// redemption depends on an exact match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Free-form social links (JSON object, opaque to the domain).
    pub social: serde_json::Value,
    pub is_admin: bool,
}

/// Fields for creating a user explicitly (the login flow instead creates a
/// bare user implicitly from an email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub social: serde_json::Value,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_email(&self.email)?;
        if self.first_name.trim().is_empty() {
            return Err(DomainError::validation("first name cannot be empty"));
        }
        if self.last_name.trim().is_empty() {
            return Err(DomainError::validation("last name cannot be empty"));
        }
        Ok(())
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub social: Option<serde_json::Value>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// Basic email shape check (full verification happens by actually mailing a
/// challenge code to the address).
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || trimmed != email {
        return Err(DomainError::validation("invalid email format"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(DomainError::validation("invalid email format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_email() {
        assert!(validate_email("alice@example.com").is_ok());
    }

    #[test]
    fn rejects_missing_at_sign() {
        assert!(validate_email("alice.example.com").is_err());
    }

    #[test]
    fn rejects_empty_local_or_domain() {
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(validate_email(" alice@example.com").is_err());
    }

    #[test]
    fn new_user_requires_names() {
        let draft = NewUser {
            email: "alice@example.com".to_string(),
            first_name: "".to_string(),
            last_name: "Smith".to_string(),
            social: serde_json::json!({}),
        };
        assert!(draft.validate().is_err());
    }
}

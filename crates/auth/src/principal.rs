//! Resolved request identity and the pure access-control decisions.

use std::collections::HashSet;

use lectern_core::{CourseId, TokenId, UserId};

use crate::error::AuthError;

/// The identity attached to an authenticated request.
///
/// Derived fresh on every request from the current token and the user's role
/// memberships; never persisted or cached beyond the request (role changes
/// must take effect on the next request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub token_id: TokenId,
    pub user_id: UserId,
    pub is_admin: bool,
    /// Courses where this user holds a TEACHER enrollment.
    pub teacher_of: HashSet<CourseId>,
}

/// Grant if the principal is an admin or is the requested user itself.
///
/// - No IO
/// - No panics
pub fn ensure_self_or_admin(requested: UserId, principal: &Principal) -> Result<(), AuthError> {
    if principal.is_admin || principal.user_id == requested {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Grant only if the principal is an admin.
pub fn ensure_admin(principal: &Principal) -> Result<(), AuthError> {
    if principal.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Grant if the principal is an admin or teaches the course.
pub fn ensure_teacher_of_or_admin(course: CourseId, principal: &Principal) -> Result<(), AuthError> {
    if principal.is_admin || principal.teacher_of.contains(&course) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

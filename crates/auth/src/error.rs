//! Authentication/authorization error taxonomy.

use thiserror::Error;

/// Error surfaced by the authentication flow and the authorization gate.
///
/// The `Unauthorized` reason is for the log, not the client: callers map all
/// variants to generic rejection responses and never echo internal detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad, expired, missing, or invalid-signature credential.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Authenticated, but insufficient privilege.
    #[error("forbidden")]
    Forbidden,

    /// Store or transport failure unrelated to the credential itself.
    #[error("internal authentication failure")]
    Internal,
}

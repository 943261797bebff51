//! `lectern-auth` — authentication/authorization core.
//!
//! This crate owns the token lifecycle: issuing email challenge codes,
//! redeeming them for API sessions, and resolving bearer credentials into a
//! request-scoped [`Principal`]. It is intentionally decoupled from HTTP and
//! storage: the store and the outbound mailer are consumed through the
//! [`TokenStore`] and [`NotificationSink`] ports.

pub mod codec;
pub mod config;
pub mod error;
pub mod flow;
pub mod gate;
pub mod principal;
pub mod sink;
pub mod store;
pub mod token;

pub use codec::{generate_challenge_code, CodecError, CredentialCodec};
pub use config::AuthConfig;
pub use error::AuthError;
pub use flow::AuthFlow;
pub use gate::AuthGate;
pub use principal::{ensure_admin, ensure_self_or_admin, ensure_teacher_of_or_admin, Principal};
pub use sink::{NotificationSink, SinkError};
pub use store::{StoreError, TokenStore, TokenWithOwner};
pub use token::{NewToken, Token, TokenKind};

#[cfg(test)]
pub(crate) mod fixtures;

//! Credential codec: challenge-code generation and bearer-token signing.

use std::collections::HashSet;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lectern_core::TokenId;

use crate::config::AuthConfig;

/// Generate a random 8-digit decimal challenge code.
///
/// Uniform over 10,000,000..=99,999,999. Uniqueness among live challenges is
/// not this function's concern; the store checks before insert.
pub fn generate_challenge_code() -> String {
    rand::thread_rng().gen_range(10_000_000i64..=99_999_999).to_string()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed credential")]
    Malformed,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Bearer-token payload: the session token id is the only claim.
///
/// Deliberately no `exp`/`iat`: expiry lives on the stored token record, and
/// the payload shape is part of the wire format.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(rename = "tokenId")]
    token_id: i64,
}

/// Stateless sign/verify over session token ids.
#[derive(Clone)]
pub struct CredentialCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        // The payload carries no registered claims; only the signature and
        // the header algorithm are checked here.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            algorithm: config.algorithm,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Produce the opaque bearer credential for a session token id.
    pub fn sign_session_token(&self, token_id: TokenId) -> Result<String, CodecError> {
        let claims = SessionClaims {
            token_id: token_id.as_i64(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    /// Verify a bearer credential and return the embedded token id.
    ///
    /// Rejects credentials whose header algorithm differs from the configured
    /// one, regardless of whether the signature would otherwise check out.
    pub fn verify_session_token(&self, credential: &str) -> Result<i64, CodecError> {
        let data = decode::<SessionClaims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => CodecError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName => {
                    CodecError::AlgorithmMismatch
                }
                _ => CodecError::Malformed,
            })?;
        Ok(data.claims.token_id)
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec(secret: &str) -> CredentialCodec {
        CredentialCodec::new(&AuthConfig::new(secret))
    }

    #[test]
    fn round_trip_recovers_token_id() {
        let codec = codec("test-secret");
        let signed = codec.sign_session_token(TokenId::new(42)).unwrap();
        assert_eq!(codec.verify_session_token(&signed).unwrap(), 42);
    }

    #[test]
    fn different_secret_fails_verification() {
        let signer = codec("secret-one");
        let verifier = codec("secret-two");
        let signed = signer.sign_session_token(TokenId::new(7)).unwrap();
        assert_eq!(
            verifier.verify_session_token(&signed),
            Err(CodecError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_signature_is_rejected_without_panic() {
        let codec = codec("test-secret");
        let signed = codec.sign_session_token(TokenId::new(7)).unwrap();

        // Flip one character in the signature segment.
        let mut bytes = signed.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(codec.verify_session_token(&tampered).is_err());
    }

    #[test]
    fn foreign_algorithm_is_rejected() {
        let secret = "test-secret";
        let mut config = AuthConfig::new(secret);
        config.algorithm = Algorithm::HS384;
        let hs384 = CredentialCodec::new(&config);
        let signed = hs384.sign_session_token(TokenId::new(7)).unwrap();

        let hs256 = codec(secret);
        assert_eq!(
            hs256.verify_session_token(&signed),
            Err(CodecError::AlgorithmMismatch)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec("test-secret");
        assert_eq!(
            codec.verify_session_token("not.a.token"),
            Err(CodecError::Malformed)
        );
        assert_eq!(codec.verify_session_token(""), Err(CodecError::Malformed));
    }

    #[test]
    fn challenge_code_is_eight_digits() {
        for _ in 0..1000 {
            let code = generate_challenge_code();
            assert_eq!(code.len(), 8);
            let n: i64 = code.parse().unwrap();
            assert!((10_000_000..=99_999_999).contains(&n));
        }
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_any_positive_id(id in 1i64..=i64::MAX) {
            let codec = codec("prop-secret");
            let signed = codec.sign_session_token(TokenId::new(id)).unwrap();
            prop_assert_eq!(codec.verify_session_token(&signed).unwrap(), id);
        }
    }
}

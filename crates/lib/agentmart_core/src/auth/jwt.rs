//! Session token verification.
//!
//! Tokens are minted by the identity provider and signed with its RSA key.
//! The service only ever holds the public half.

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use crate::models::auth::TokenClaims;

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Signature has expired")]
    Expired,

    #[error("Signature verification failed")]
    BadSignature,

    #[error("{0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// The configured public key could not be loaded.
#[derive(Debug, Error)]
#[error("invalid token verification key: {0}")]
pub struct InvalidKey(String);

/// Verifies RS256 session tokens against a single public key.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier from a PEM-encoded RSA public key.
    ///
    /// Escaped newlines (`\n` as two characters) are accepted so the key can
    /// be supplied as a single-line environment variable.
    pub fn from_rsa_pem(pem: &str) -> Result<Self, InvalidKey> {
        let pem = pem.trim().replace("\\n", "\n");
        let key =
            DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    pub fn new(key: DecodingKey) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        // Provider session tokens carry `azp`, not `aud`.
        validation.validate_aud = false;
        // Session tokens live about a minute; no grace period on `exp`.
        validation.leeway = 0;
        validation.validate_nbf = true;
        Self { key, validation }
    }

    /// Verify signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

//! Authentication and authorization logic.
//!
//! Token verification, the identity cache and resolver, the identity
//! provider client, and the claims-based permission evaluator. Everything
//! here is transport-agnostic; the API crate maps [`AuthError`] onto HTTP.

pub mod cache;
pub mod clerk;
pub mod jwt;
pub mod permissions;
pub mod provider;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;
use tracing::debug;

use self::jwt::TokenError;
use self::permissions::Denial;
use self::provider::ProviderError;

/// Authentication and authorization failures.
///
/// The `Display` output of each variant is the caller-visible detail message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token signature")]
    TokenBadSignature,

    #[error("Invalid token format")]
    TokenMalformed,

    /// Decode failure seen by the permission evaluator (anything but expiry).
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid token: No {0} found")]
    MissingClaim(&'static str),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid authorization header")]
    InvalidAuthorizationHeader,

    #[error("Session is not active. Current status: {0}")]
    SessionInactive(String),

    #[error("Invalid or expired session token")]
    SessionRejected(String),

    #[error("Authentication error: {0}")]
    ProviderFault(String),

    #[error(transparent)]
    Denied(#[from] Denial),
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The caller could not be authenticated.
    Unauthenticated,
    /// The caller is known but not allowed.
    Forbidden,
    /// A server-side fault or misconfiguration.
    Internal,
}

impl AuthError {
    pub fn failure(&self) -> AuthFailure {
        match self {
            AuthError::Denied(denial) if denial.is_configuration_error() => AuthFailure::Internal,
            AuthError::Denied(_) => AuthFailure::Forbidden,
            AuthError::ProviderFault(_) => AuthFailure::Internal,
            _ => AuthFailure::Unauthenticated,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::BadSignature => AuthError::TokenBadSignature,
            TokenError::Malformed(reason) => {
                debug!(%reason, "rejecting malformed token");
                AuthError::TokenMalformed
            }
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected(msg) => AuthError::SessionRejected(msg),
            ProviderError::Unavailable(msg) => AuthError::ProviderFault(msg),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// Anything after a second space is ignored.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .and_then(|rest| rest.split(' ').next())
}

//! Identity provider abstraction.
//!
//! The resolver only needs two lookups from the provider: a user by ID and a
//! session by ID. Keeping them behind a trait lets tests swap in a fake.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::{Identity, Session};

/// Provider lookup failures.
///
/// `Clone` so a single failed lookup can be shared by every caller waiting on
/// the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider answered and refused: unknown user, revoked session,
    /// bad credentials.
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// The provider could not be reached or returned something unusable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Lookups against the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch a user record by provider user ID.
    async fn get_user(&self, user_id: &str) -> Result<Identity, ProviderError>;

    /// Fetch a session record by provider session ID.
    async fn get_session(&self, session_id: &str) -> Result<Session, ProviderError>;
}

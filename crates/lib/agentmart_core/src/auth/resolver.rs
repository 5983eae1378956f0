//! Bearer token to caller identity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::AuthError;
use super::cache::{CacheKey, IdentityCache, TimeBucket};
use super::jwt::TokenVerifier;
use super::provider::{IdentityProvider, ProviderError};
use crate::models::auth::Identity;

/// Resolves the caller behind a session token.
///
/// Identities are cached per `(subject, bucket)`. When the cached path fails
/// the provider is asked directly, and a successful answer replaces the
/// entry for that key.
pub struct IdentityResolver {
    verifier: TokenVerifier,
    provider: Arc<dyn IdentityProvider>,
    cache: IdentityCache,
    verify_sessions: bool,
}

impl IdentityResolver {
    pub fn new(
        verifier: TokenVerifier,
        provider: Arc<dyn IdentityProvider>,
        cache: IdentityCache,
    ) -> Self {
        Self {
            verifier,
            provider,
            cache,
            verify_sessions: false,
        }
    }

    /// Also fetch the provider session and require it to be active.
    pub fn with_session_check(mut self, enabled: bool) -> Self {
        self.verify_sessions = enabled;
        self
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub async fn resolve_current_user(&self, token: &str) -> Result<Identity, AuthError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve as of `now`, which picks the cache bucket.
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let claims = self.verifier.verify(token)?;

        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingClaim("user ID"))?;
        let session_id = claims
            .sid
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingClaim("session ID"))?;

        if self.verify_sessions {
            let session = self.provider.get_session(&session_id).await?;
            if !session.is_active() {
                debug!(%session_id, status = %session.status, "inactive session");
                return Err(AuthError::SessionInactive(session.status));
            }
        }

        Ok(self.resolve(&subject, TimeBucket::at(now)).await?)
    }

    /// Look up `subject` through the cache, falling back to a direct
    /// provider call when the cached path fails.
    pub async fn resolve(&self, subject: &str, bucket: TimeBucket) -> Result<Identity, ProviderError> {
        let key = CacheKey::new(subject, bucket);
        match self
            .cache
            .get_or_populate(key.clone(), self.provider.get_user(subject))
            .await
        {
            Ok(identity) => Ok(identity),
            Err(e) => {
                warn!(subject, error = %e, "cached identity lookup failed, retrying directly");
                let fresh = self.provider.get_user(subject).await?;
                self.cache.invalidate(&key).await;
                let seed = fresh.clone();
                self.cache
                    .get_or_populate(key, async move { Ok(seed) })
                    .await?;
                Ok(fresh)
            }
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("verifier", &self.verifier)
            .field("cache", &self.cache)
            .field("verify_sessions", &self.verify_sessions)
            .finish_non_exhaustive()
    }
}

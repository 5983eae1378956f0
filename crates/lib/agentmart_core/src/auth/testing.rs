//! Test fixtures: a fixed RSA key pair, token signing and a counting provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;

use super::jwt::TokenVerifier;
use super::provider::{IdentityProvider, ProviderError};
use crate::models::auth::{Identity, Session};

pub const PUBLIC_KEY: &str = include_str!("../../testdata/jwt_public.pem");
pub const PRIVATE_KEY: &str = include_str!("../../testdata/jwt_private.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../../testdata/other_private.pem");

pub fn verifier() -> TokenVerifier {
    TokenVerifier::from_rsa_pem(PUBLIC_KEY).expect("test public key")
}

pub fn sign(claims: &Value) -> String {
    sign_with(claims, PRIVATE_KEY)
}

pub fn sign_with(claims: &Value, private_pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("test private key");
    encode(&Header::new(Algorithm::RS256), claims, &key).expect("sign test token")
}

pub fn future_exp() -> i64 {
    Utc::now().timestamp() + 3600
}

pub fn past_exp() -> i64 {
    Utc::now().timestamp() - 3600
}

pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
        first_name: Some("Test".into()),
        last_name: Some("User".into()),
    }
}

/// In-memory provider that counts user lookups and can fail on demand.
#[derive(Default)]
pub struct CountingProvider {
    pub users: HashMap<String, Identity>,
    pub sessions: HashMap<String, Session>,
    pub user_calls: AtomicUsize,
    /// Number of upcoming `get_user` calls that fail with `Unavailable`.
    pub failures_remaining: AtomicUsize,
}

impl CountingProvider {
    pub fn with_user(id: &str) -> Self {
        let mut provider = Self::default();
        provider.users.insert(id.to_string(), identity(id));
        provider
    }

    pub fn with_session(mut self, id: &str, user_id: &str, status: &str) -> Self {
        self.sessions.insert(
            id.to_string(),
            Session {
                id: id.to_string(),
                user_id: user_id.to_string(),
                status: status.to_string(),
            },
        );
        self
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for CountingProvider {
    async fn get_user(&self, user_id: &str) -> Result<Identity, ProviderError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProviderError::Unavailable("injected failure".into()));
        }
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected(format!("user {user_id} not found")))
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, ProviderError> {
        self.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected(format!("session {session_id} not found")))
    }
}

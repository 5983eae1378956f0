//! Shared fixtures for the API integration tests: an in-memory app with a
//! stub identity provider and RS256 test tokens.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use agentmart_api::{AppState, config::ApiConfig};
use agentmart_core::auth::cache::IdentityCache;
use agentmart_core::auth::jwt::TokenVerifier;
use agentmart_core::auth::provider::{IdentityProvider, ProviderError};
use agentmart_core::auth::resolver::IdentityResolver;
use agentmart_core::catalog::memory::MemoryStore;
use agentmart_core::models::auth::{Identity, Session};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const PUBLIC_KEY: &str = include_str!("../../../agentmart_core/testdata/jwt_public.pem");
pub const PRIVATE_KEY: &str = include_str!("../../../agentmart_core/testdata/jwt_private.pem");

pub const ADMIN: &str = "user_admin";
pub const MEMBER: &str = "user_member";
pub const OTHER: &str = "user_other";

pub const WRITE_PERMISSION: &str = "org:all_content:manage";

/// Identity provider that knows a fixed set of users.
pub struct StubProvider {
    users: HashMap<String, Identity>,
}

impl StubProvider {
    pub fn new(ids: &[&str]) -> Self {
        let users = ids
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    Identity {
                        id: id.to_string(),
                        email: Some(format!("{id}@example.com")),
                        first_name: None,
                        last_name: None,
                    },
                )
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn get_user(&self, user_id: &str) -> Result<Identity, ProviderError> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected(format!("no user {user_id}")))
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, ProviderError> {
        Err(ProviderError::Rejected(format!("no session {session_id}")))
    }
}

pub fn config(write_permission: &str) -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: String::new(),
        clerk_jwt_key: PUBLIC_KEY.into(),
        clerk_secret_key: "sk_test".into(),
        clerk_api_url: "http://127.0.0.1:9/v1".into(),
        identity_cache_capacity: 100,
        provider_timeout_secs: 1,
        verify_sessions: false,
        agent_admin_role: "admin".into(),
        agent_write_permission: write_permission.into(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_permission(WRITE_PERMISSION)
    }

    pub fn with_permission(write_permission: &str) -> Self {
        let store = Arc::new(MemoryStore::new());
        let verifier = TokenVerifier::from_rsa_pem(PUBLIC_KEY).expect("test public key");
        let provider = Arc::new(StubProvider::new(&[ADMIN, MEMBER, OTHER]));
        let resolver = Arc::new(IdentityResolver::new(
            verifier,
            provider,
            IdentityCache::new(100),
        ));
        let state = AppState::new(store.clone(), resolver, config(write_permission));
        Self {
            router: agentmart_api::router(state),
            store,
        }
    }

    /// Send a request and return the status plus the parsed JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(method, uri, auth, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        (status, json)
    }

    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("build request");

        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, bytes.to_vec())
    }

    /// Create an agent as the admin and return its JSON.
    pub async fn create_agent(&self, name: &str) -> Value {
        let (status, body) = self
            .send("POST", "/api/v1/agents", Some(&admin()), Some(agent_body(name)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn sign(claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).expect("test private key");
    encode(&Header::new(Algorithm::RS256), claims, &key).expect("sign token")
}

pub fn bearer(claims: &Value) -> String {
    format!("Bearer {}", sign(claims))
}

/// Token for `user` carrying the given organization role and actions and
/// the `all_content` feature.
pub fn token_for(user: &str, role: &str, actions: &str) -> String {
    bearer(&json!({
        "sub": user,
        "sid": format!("sess_{user}"),
        "exp": now() + 3600,
        "o": { "rol": role, "per": actions },
        "fea": "all_content"
    }))
}

pub fn admin() -> String {
    token_for(ADMIN, "admin", "read,manage")
}

pub fn member() -> String {
    token_for(MEMBER, "member", "read")
}

pub fn other() -> String {
    token_for(OTHER, "member", "read")
}

pub fn agent_body(name: &str) -> Value {
    json!({
        "name": name,
        "title": format!("{name} title"),
        "description": format!("{name} writes professional documents"),
        "version": "1.0.0",
        "features": "Fast\nAccurate",
        "pricing_model": "paid",
        "price": 9.99,
        "provider": "Nebula Digital",
        "tags": ["hr"]
    })
}

//! Clerk backend API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::provider::{IdentityProvider, ProviderError};
use crate::models::auth::{Identity, Session};

/// Default backend API base.
pub const DEFAULT_API_URL: &str = "https://api.clerk.com/v1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Identity {
            id: user.id,
            email: user
                .email_addresses
                .into_iter()
                .next()
                .map(|e| e.email_address),
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    user_id: String,
    status: String,
}

/// Identity provider backed by the Clerk backend API.
#[derive(Clone)]
pub struct ClerkProvider {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl ClerkProvider {
    pub fn new(base_url: Url, secret_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url,
            secret_key: secret_key.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Unavailable(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, ProviderError> {
        debug!(%url, "identity provider request");
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "identity provider request failed");
                ProviderError::Unavailable(format!("request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(classify(status, body));
        }

        resp.json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("response parse error: {e}")))
    }
}

fn classify(status: StatusCode, body: String) -> ProviderError {
    if status.is_client_error() {
        ProviderError::Rejected(format!("{status}: {body}"))
    } else {
        ProviderError::Unavailable(format!("{status}: {body}"))
    }
}

#[async_trait]
impl IdentityProvider for ClerkProvider {
    async fn get_user(&self, user_id: &str) -> Result<Identity, ProviderError> {
        let url = self.endpoint(&["users", user_id])?;
        self.fetch::<UserResponse>(url).await.map(Identity::from)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, ProviderError> {
        let url = self.endpoint(&["sessions", session_id])?;
        let session: SessionResponse = self.fetch(url).await?;
        Ok(Session {
            id: session.id,
            user_id: session.user_id,
            status: session.status,
        })
    }
}

impl std::fmt::Debug for ClerkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkProvider")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

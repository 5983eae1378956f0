//! Authentication domain models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claims carried by an identity-provider session token.
///
/// Only the claims the service reads are modelled; anything else in the
/// payload is ignored. The organization object and the feature list are kept
/// loosely typed because the authorization evaluator has to tell "absent",
/// "empty" and "wrong type" apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Provider user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Provider session ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Expiry (unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at (unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Active organization object: `rol` (role) and `per` (comma-separated
    /// actions). Any other shape counts as no organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o: Option<Value>,
    /// Comma-separated feature list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fea: Option<Value>,
}

/// Resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Provider-side session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub status: String,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

//! Subscription (purchase) models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::UnknownVariant;

/// Modality recorded when the caller does not name one.
pub const DEFAULT_PURCHASE_MODALITY: &str = "default";

/// Longest purchase modality the store accepts.
pub const MAX_PURCHASE_MODALITY_LEN: usize = 50;

/// State of a user's purchase of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipStatus {
    Active,
    Unsubscribed,
    Expired,
}

impl OwnershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Unsubscribed => "unsubscribed",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for OwnershipStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "unsubscribed" => Ok(Self::Unsubscribed),
            "expired" => Ok(Self::Expired),
            other => Err(UnknownVariant {
                kind: "ownership status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OwnershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's purchase of, or subscription to, an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: Uuid,
    pub purchase_modality: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub ownership_status: OwnershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.ownership_status == OwnershipStatus::Active
    }

    /// Mark as unsubscribed, expiring now.
    pub fn unsubscribe(&mut self, now: DateTime<Utc>) {
        self.ownership_status = OwnershipStatus::Unsubscribed;
        self.expiry_date = Some(now);
        self.updated_at = now;
    }
}

/// Subscribe request body. The user is always the authenticated caller, so
/// any `user_id` in the body is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub agent_id: Uuid,
    #[serde(default)]
    pub purchase_modality: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ownership_status: Option<OwnershipStatus>,
}

impl NewSubscription {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(modality) = &self.purchase_modality {
            if modality.chars().count() > MAX_PURCHASE_MODALITY_LEN {
                return Err(format!(
                    "purchase_modality must be at most {MAX_PURCHASE_MODALITY_LEN} characters"
                ));
            }
        }
        Ok(())
    }

    /// Fill defaults and bind to `user_id`.
    pub fn into_subscription(self, id: Uuid, user_id: &str, now: DateTime<Utc>) -> Subscription {
        Subscription {
            id,
            user_id: user_id.to_string(),
            agent_id: self.agent_id,
            purchase_modality: self
                .purchase_modality
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_PURCHASE_MODALITY.to_string()),
            purchase_date: Some(self.purchase_date.unwrap_or(now)),
            expiry_date: self.expiry_date,
            ownership_status: self.ownership_status.unwrap_or(OwnershipStatus::Active),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A subscription joined with the agent it grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub agent_name: String,
    pub agent_title: String,
    pub agent_description: String,
    pub agent_image_url: Option<String>,
    pub purchase_modality: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub ownership_status: OwnershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

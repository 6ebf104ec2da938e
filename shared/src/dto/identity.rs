use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wallet::WalletLink;

/// One anonymous-or-linked visitor as stored by the backend.
///
/// The `id` is generated client-side (UUID v4) and the backend fetches or
/// creates the record for it. `is_logged_in` is a UI gate only; the identity
/// exists whether or not it is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(alias = "userId")]
    pub id: String,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub wallets: Vec<WalletLink>,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub activity: UserActivity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserIdentity {
    /// Fresh record for a client-generated id, used before the backend answers.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_logged_in: false,
            wallets: Vec::new(),
            preferences: UserPreferences::default(),
            activity: UserActivity::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Look up a linked wallet by address.
    pub fn wallet(&self, address: &str) -> Option<&WalletLink> {
        self.wallets.iter().find(|w| w.address == address)
    }

    pub fn has_wallet(&self, address: &str) -> bool {
        self.wallet(address).is_some()
    }

    /// True when `address` is linked to this identity with a validated signature.
    pub fn is_wallet_verified(&self, address: &str) -> bool {
        self.wallet(address).is_some_and(|w| w.verified)
    }

    /// The wallet to show as "the" wallet of this identity.
    ///
    /// Uses the server-computed `is_primary` flag when present. Otherwise
    /// falls back to the same rule the backend applies: the most recently
    /// used verified wallet, then the most recently used unverified one.
    pub fn primary_wallet(&self) -> Option<&WalletLink> {
        if let Some(flagged) = self.wallets.iter().find(|w| w.is_primary) {
            return Some(flagged);
        }

        let most_recent = |verified: bool| {
            self.wallets
                .iter()
                .filter(|w| w.verified == verified)
                .max_by_key(|w| w.last_used)
        };

        most_recent(true).or_else(|| most_recent(false))
    }
}

/// User preferences.
///
/// Keys the client does not recognise are dropped when a backend record is
/// decoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub notifications: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// First-seen / last-seen and page-view counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page_views: u64,
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub total_duration_seconds: u64,
}

/// `{ "user": ... }` envelope used by every route that returns an updated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub user: UserIdentity,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::UserIdentity;

/// One external wallet address associated with a user identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletLink {
    pub address: String,
    pub linked_at: DateTime<Utc>,
    /// Set only after the backend validated a signature for this address.
    #[serde(default)]
    pub verified: bool,
    /// Server-computed, see [`UserIdentity::primary_wallet`].
    #[serde(default)]
    pub is_primary: bool,
    pub last_used: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// `POST /user/{id}/wallet/connect`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectWalletRequest {
    pub address: String,
}

/// Answer to a connect request.
///
/// Either `success` with the refreshed user, or `loginRequired` with the id
/// of the identity that already owns the address as a verified wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,
    #[serde(default)]
    pub login_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `POST /user/{id}/wallet`: signature-backed verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkWalletRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
    /// Milliseconds since the Unix epoch, identical to the one in `message`.
    pub timestamp: i64,
}

/// Answer to a verification request.
///
/// With `identitySwapped` the returned `user` is a *different* identity that
/// already owned the wallet; the client must adopt it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkWalletResponse {
    pub user: UserIdentity,
    #[serde(default)]
    pub identity_swapped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_user_id: Option<String>,
}

/// `DELETE /user/{id}/wallet/{address}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlinkWalletRequest {
    pub message: String,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_response_login_required() {
        let body = r#"{"success":false,"loginRequired":true,"existingUserId":"U2"}"#;
        let response: ConnectWalletResponse = serde_json::from_str(body).unwrap();

        assert!(!response.success);
        assert!(response.login_required);
        assert_eq!(response.existing_user_id.as_deref(), Some("U2"));
        assert!(response.user.is_none());
    }

    #[test]
    fn test_link_request_wire_names() {
        let request = LinkWalletRequest {
            address: "TAddr1".to_string(),
            message: "msg".to_string(),
            signature: "sig".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["address"], "TAddr1");
        assert_eq!(json["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_link_response_defaults_to_no_swap() {
        let body = r#"{"user":{"id":"U1"}}"#;
        let response: LinkWalletResponse = serde_json::from_str(body).unwrap();

        assert!(!response.identity_swapped);
        assert!(response.previous_user_id.is_none());
    }
}

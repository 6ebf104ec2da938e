//! # Service Traits
//!
//! Seams between the linker state machine and its two collaborators: the
//! backend identity service and the wallet provider. Production code uses
//! [`crate::services::api::ApiClient`] and a real provider; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use shared::{
    ConnectWalletResponse, LinkWalletRequest, LinkWalletResponse, SessionSnapshot,
    SessionStartRequest, UnlinkWalletRequest, UserIdentity,
};

use crate::core::error::ApiError;

/// Backend identity service (`/user/{id}/...`).
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Fetch the record for `user_id`, creating it when the backend has none.
    async fn fetch_user(&self, user_id: &str) -> Result<UserIdentity, ApiError>;

    /// Store `address` as an unverified wallet of `user_id`.
    async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<ConnectWalletResponse, ApiError>;

    /// Submit a signed challenge proving ownership of a wallet.
    async fn link_wallet(&self, user_id: &str, request: &LinkWalletRequest) -> Result<LinkWalletResponse, ApiError>;

    async fn unlink_wallet(
        &self,
        user_id: &str,
        address: &str,
        request: &UnlinkWalletRequest,
    ) -> Result<UserIdentity, ApiError>;

    async fn set_primary_wallet(&self, user_id: &str, address: &str) -> Result<UserIdentity, ApiError>;

    async fn login(&self, user_id: &str) -> Result<UserIdentity, ApiError>;

    async fn logout(&self, user_id: &str) -> Result<UserIdentity, ApiError>;

    async fn start_session(&self, user_id: &str, request: &SessionStartRequest) -> Result<SessionSnapshot, ApiError>;

    async fn record_page(&self, user_id: &str, path: &str) -> Result<(), ApiError>;

    async fn heartbeat(&self, user_id: &str) -> Result<(), ApiError>;

    async fn end_session(&self, user_id: &str) -> Result<(), ApiError>;

    /// Queue a fire-and-forget session end that survives teardown.
    ///
    /// Returns `false` when no such mechanism is available, in which case the
    /// caller falls back to [`IdentityApi::end_session`].
    fn send_end_beacon(&self, _user_id: &str) -> bool {
        false
    }
}

/// Raw answer of the provider's account request (`tron_requestAccounts`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountsResponse {
    /// `None` when the provider answered without a code (locked wallet).
    pub code: Option<i64>,
    pub message: Option<String>,
}

impl AccountsResponse {
    pub fn with_code(code: i64) -> Self {
        Self {
            code: Some(code),
            message: None,
        }
    }
}

/// Injected wallet provider capability (browser extension or local key).
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Whether a provider is present. Must never prompt the user.
    fn detect(&self) -> bool;

    /// Active address the provider already exposes to this site, if any.
    fn default_address(&self) -> Option<String>;

    /// Ask the provider for account access (may open a prompt).
    async fn request_accounts(&self) -> AccountsResponse;

    fn supports_signing(&self) -> bool;

    /// Sign a UTF-8 message, returning the encoded signature.
    async fn sign_message(&self, message: &str) -> Result<String, String>;
}

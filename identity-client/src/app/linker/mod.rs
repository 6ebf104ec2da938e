//! # Identity Linker
//!
//! Side-effect runner for the two-step wallet link: *connect* stores the
//! address server-side as unverified, *verify* proves ownership with a signed
//! challenge. State transitions themselves are pure ([`AppState::apply`]);
//! this module decides which action to dispatch for each provider or backend
//! answer.
//!
//! ```text
//! Unlinked ──connect──▶ ConnectedUnverified ──verify──▶ Verified
//!     │                                                   ▲
//!     └──connect (owned elsewhere)──▶ LoginRequired ──verify (swap)
//!                                         │
//!                                   cancel_login ──▶ Unlinked
//! ```
//!
//! Every backend answer is checked against the identity id and connected
//! address captured before the request. If either changed meanwhile the answer
//! is dropped.
//!
//! [`AppState::apply`]: crate::app::state::AppState::apply

use std::collections::HashSet;
use std::sync::Arc;

use lib_utils::now_millis;
use parking_lot::Mutex;
use shared::{LinkWalletRequest, UnlinkWalletRequest};

use crate::app::events::{ClientEvent, EventSink, NoticeLevel};
use crate::app::identity::IdentityStore;
use crate::app::state::SessionAction;
use crate::app::store::SessionStore;
use crate::core::error::LinkError;
use crate::core::service::IdentityApi;
use crate::provider::connection::ConnectionManager;


/// What a signed challenge authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePurpose {
    Link,
    Login,
    Unlink,
}

impl ChallengePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengePurpose::Link => "link",
            ChallengePurpose::Login => "login",
            ChallengePurpose::Unlink => "unlink",
        }
    }

    fn prompt(&self) -> &'static str {
        match self {
            ChallengePurpose::Link => "Sign this message to link your wallet to your account.",
            ChallengePurpose::Login => "Sign this message to log in with your wallet.",
            ChallengePurpose::Unlink => "Sign this message to remove this wallet from your account.",
        }
    }
}

/// Message the provider is asked to sign.
pub fn challenge_message(purpose: ChallengePurpose, address: &str, timestamp: i64) -> String {
    format!(
        "{}\n\nWallet: {}\nPurpose: {}\nTimestamp: {}",
        purpose.prompt(),
        address,
        purpose.as_str(),
        timestamp
    )
}

/// Result of the connect transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Backend stored the address as an unverified wallet.
    Linked,
    /// Address is verified by another identity.
    LoginRequired { existing_owner: String },
    /// Address already belongs to the identity; no backend call.
    AlreadyKnown { verified: bool },
    /// Backend was already asked about this address in this connect cycle.
    AlreadyAttempted,
    /// No identity loaded or no wallet connected.
    Skipped,
    /// Answer arrived after the identity or address changed.
    Stale,
}

/// Result of the verify transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The wallet's owner replaced the local identity.
    IdentitySwapped { previous: String, current: String },
    AlreadyVerified,
    Stale,
}

pub struct IdentityLinker {
    api: Arc<dyn IdentityApi>,
    connection: ConnectionManager,
    store: SessionStore,
    identity: Option<IdentityStore>,
    events: EventSink,
    /// Addresses the backend was asked to connect since the last reset.
    attempted: Mutex<HashSet<String>>,
}

impl IdentityLinker {
    pub fn new(api: Arc<dyn IdentityApi>, connection: ConnectionManager, store: SessionStore, events: EventSink) -> Self {
        Self {
            api,
            connection,
            store,
            identity: None,
            events,
            attempted: Mutex::new(HashSet::new()),
        }
    }

    /// Persist adopted identities after a swap.
    pub fn with_identity_store(mut self, identity: IdentityStore) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn is_current(&self, user_id: &str, address: &str) -> bool {
        let (current_user, current_address) = self.store.identity_and_address();
        current_user.as_deref() == Some(user_id) && current_address.as_deref() == Some(address)
    }

    fn current_user_id(&self) -> Result<String, LinkError> {
        self.store.user_id().ok_or(LinkError::NoIdentity)
    }

    // ==================== CONNECT ====================

    /// Connect the provider, then run the connect transition.
    pub async fn connect_wallet(&self) -> Result<LinkOutcome, LinkError> {
        self.connection
            .connect()
            .await
            .map_err(|e| LinkError::ConnectFailed(e.to_string()))?;
        self.link_connected_wallet().await
    }

    /// Store the connected address against the current identity.
    ///
    /// Safe to call on every state change: the backend is asked at most once
    /// per address until the next disconnect, cancel or logout.
    #[tracing::instrument(skip(self))]
    pub async fn link_connected_wallet(&self) -> Result<LinkOutcome, LinkError> {
        let (Some(user_id), Some(address)) = self.store.identity_and_address() else {
            return Ok(LinkOutcome::Skipped);
        };

        let known = self.store.read(|s| {
            s.user
                .as_ref()
                .and_then(|u| u.wallet(&address))
                .map(|w| w.verified)
        });
        if let Some(verified) = known {
            tracing::debug!(address = %address, verified, "Wallet already known to identity");
            return Ok(LinkOutcome::AlreadyKnown { verified });
        }

        if !self.attempted.lock().insert(address.clone()) {
            return Ok(LinkOutcome::AlreadyAttempted);
        }

        tracing::info!(user_id = %user_id, address = %address, "Connecting wallet to identity");
        let result = self.api.connect_wallet(&user_id, &address).await;

        if !self.is_current(&user_id, &address) {
            tracing::debug!(address = %address, "Dropping stale connect response");
            return Ok(LinkOutcome::Stale);
        }

        let failure = match result {
            Ok(response) if response.login_required => match response.existing_user_id {
                Some(existing_owner) => {
                    tracing::info!(address = %address, existing_owner = %existing_owner, "Wallet belongs to another identity");
                    self.store.dispatch(SessionAction::LoginRequired {
                        address: address.clone(),
                        existing_owner: existing_owner.clone(),
                    });
                    self.events.emit(ClientEvent::LoginRequired {
                        address,
                        existing_owner: existing_owner.clone(),
                    });
                    return Ok(LinkOutcome::LoginRequired { existing_owner });
                }
                None => "Backend reported an owner conflict without an owner id".to_string(),
            },
            Ok(response) if response.success => {
                self.store.dispatch(SessionAction::WalletConnected { user: response.user });
                return Ok(LinkOutcome::Linked);
            }
            Ok(response) => response
                .message
                .unwrap_or_else(|| "Wallet connection was not accepted".to_string()),
            Err(err) => err.user_message(),
        };

        // Forget the attempt so an explicit retry reaches the backend again
        self.attempted.lock().remove(&address);
        tracing::warn!(address = %address, error = %failure, "Wallet connect failed");
        self.store.dispatch(SessionAction::WalletLinkFailed {
            message: failure.clone(),
        });
        self.events.notify(NoticeLevel::Error, format!("Failed to connect wallet: {}", failure));
        Err(LinkError::ConnectFailed(failure))
    }

    // ==================== VERIFY ====================

    /// Prove ownership of the connected wallet with a signed challenge.
    ///
    /// From `LoginRequired` this signs in as the wallet's owner, replacing the
    /// local identity.
    #[tracing::instrument(skip(self))]
    pub async fn verify_wallet(&self) -> Result<VerifyOutcome, LinkError> {
        let user_id = self.current_user_id()?;
        let address = self.store.connected_address().ok_or(LinkError::NoConnectedWallet)?;
        let pending = self.store.pending_login();

        if pending.is_none() && self.store.is_wallet_verified() {
            return Ok(VerifyOutcome::AlreadyVerified);
        }
        if self.store.is_verifying() {
            return Err(LinkError::VerifyFailed("A verification is already in progress".to_string()));
        }

        let gateway = self.connection.gateway();
        if !gateway.supports_signing() {
            let err = LinkError::SignatureUnavailable;
            self.store.dispatch(SessionAction::VerificationFailed {
                message: err.to_string(),
            });
            self.events.notify(NoticeLevel::Error, err.to_string());
            return Err(err);
        }

        let purpose = if pending.is_some() {
            ChallengePurpose::Login
        } else {
            ChallengePurpose::Link
        };
        let timestamp = now_millis();
        let message = challenge_message(purpose, &address, timestamp);

        self.store.dispatch(SessionAction::VerificationStarted);

        let signature = match gateway.sign_message(&message).await {
            Ok(signature) => signature,
            Err(reason) => {
                if !self.is_current(&user_id, &address) {
                    return Ok(VerifyOutcome::Stale);
                }
                return Err(self.verification_failed(format!("Signature request failed: {}", reason)));
            }
        };

        let request = LinkWalletRequest {
            address: address.clone(),
            message,
            signature,
            timestamp,
        };
        tracing::info!(user_id = %user_id, address = %address, purpose = purpose.as_str(), "Submitting wallet signature");
        let result = self.api.link_wallet(&user_id, &request).await;

        if !self.is_current(&user_id, &address) {
            // The wallet or identity change already reset the in-flight flag,
            // which may now belong to a newer verification
            tracing::debug!(address = %address, "Dropping stale verify response");
            return Ok(VerifyOutcome::Stale);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.verification_failed(err.user_message())),
        };

        let current = response.user.id.clone();
        let swapped = response.identity_swapped || current != user_id;
        self.store.dispatch(SessionAction::VerificationSucceeded { user: response.user });

        if !swapped {
            tracing::info!(address = %address, "Wallet verified");
            self.events.notify(NoticeLevel::Success, "Wallet verified");
            return Ok(VerifyOutcome::Verified);
        }

        let previous = response.previous_user_id.unwrap_or(user_id);
        tracing::info!(previous = %previous, current = %current, "Identity swapped to wallet owner");
        if let Some(identity) = &self.identity {
            if let Err(err) = identity.persist(&current) {
                tracing::warn!(error = %err, "Failed to persist adopted identity");
            }
        }
        self.attempted.lock().clear();
        self.events.emit(ClientEvent::IdentitySwapped {
            previous: previous.clone(),
            current: current.clone(),
        });
        self.events.notify(NoticeLevel::Success, "Signed in with wallet");
        Ok(VerifyOutcome::IdentitySwapped { previous, current })
    }

    fn verification_failed(&self, message: String) -> LinkError {
        tracing::warn!(error = %message, "Wallet verification failed");
        self.store.dispatch(SessionAction::VerificationFailed {
            message: message.clone(),
        });
        self.events.notify(NoticeLevel::Error, format!("Failed to verify wallet: {}", message));
        LinkError::VerifyFailed(message)
    }

    // ==================== LOCAL RESETS ====================

    /// Abandon a pending login and drop the provider session. No backend call.
    pub fn cancel_login(&self) {
        tracing::info!("Wallet login cancelled");
        self.attempted.lock().clear();
        self.store.dispatch(SessionAction::LoginCancelled);
    }

    pub fn disconnect(&self) {
        self.attempted.lock().clear();
        self.connection.disconnect();
    }

    // ==================== WALLET MANAGEMENT ====================

    /// Remove a wallet from the identity. Requires a signature from it.
    #[tracing::instrument(skip(self))]
    pub async fn unlink_wallet(&self, address: &str) -> Result<(), LinkError> {
        let user_id = self.current_user_id()?;

        let gateway = self.connection.gateway();
        if !gateway.supports_signing() {
            return Err(LinkError::SignatureUnavailable);
        }

        let message = challenge_message(ChallengePurpose::Unlink, address, now_millis());
        let signature = gateway
            .sign_message(&message)
            .await
            .map_err(|reason| self.wallet_update_failed(format!("Signature request failed: {}", reason)))?;

        let request = UnlinkWalletRequest { message, signature };
        let user = self
            .api
            .unlink_wallet(&user_id, address, &request)
            .await
            .map_err(|err| self.wallet_update_failed(err.user_message()))?;

        if self.store.user_id().as_deref() != Some(user_id.as_str()) {
            tracing::debug!("Dropping stale unlink response");
            return Ok(());
        }

        self.attempted.lock().remove(address);
        self.store.dispatch(SessionAction::UserLoaded(user));
        self.events.notify(NoticeLevel::Info, "Wallet removed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_primary_wallet(&self, address: &str) -> Result<(), LinkError> {
        let user_id = self.current_user_id()?;

        let user = self
            .api
            .set_primary_wallet(&user_id, address)
            .await
            .map_err(|err| self.wallet_update_failed(err.user_message()))?;

        if self.store.user_id().as_deref() == Some(user_id.as_str()) {
            self.store.dispatch(SessionAction::UserLoaded(user));
        }
        Ok(())
    }

    fn wallet_update_failed(&self, message: String) -> LinkError {
        tracing::warn!(error = %message, "Wallet update failed");
        self.events.notify(NoticeLevel::Error, format!("Failed to update wallet: {}", message));
        LinkError::WalletUpdateFailed(message)
    }

    // ==================== LOGIN GATE ====================

    #[tracing::instrument(skip(self))]
    pub async fn login(&self) -> Result<(), LinkError> {
        let user_id = self.current_user_id()?;

        match self.api.login(&user_id).await {
            Ok(user) => {
                if self.store.user_id().as_deref() == Some(user_id.as_str()) {
                    self.store.dispatch(SessionAction::LoggedIn(user));
                }
                Ok(())
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(error = %message, "Login failed");
                self.events.notify(NoticeLevel::Error, format!("Login failed: {}", message));
                Err(LinkError::LoginFailed(message))
            }
        }
    }

    /// Log out and drop the wallet connection.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), LinkError> {
        let user_id = self.current_user_id()?;

        match self.api.logout(&user_id).await {
            Ok(user) => {
                if self.store.user_id().as_deref() == Some(user_id.as_str()) {
                    self.store.dispatch(SessionAction::LoggedOut(user));
                }
                self.disconnect();
                Ok(())
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(error = %message, "Logout failed");
                self.events.notify(NoticeLevel::Error, format!("Logout failed: {}", message));
                Err(LinkError::LogoutFailed(message))
            }
        }
    }
}

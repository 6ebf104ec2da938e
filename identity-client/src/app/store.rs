//! # Session State Store
//!
//! Shared handle over [`AppState`]. Readers take short read locks through the
//! selectors; writers only go through [`SessionStore::dispatch`]. Locks are
//! never held across an `.await`.

use std::sync::Arc;

use parking_lot::RwLock;
use shared::{UserIdentity, WalletLink};

use super::state::{AppState, ConnectionStatus, LinkPhase, PendingLogin, SessionAction};

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<AppState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated from a server-rendered identity snapshot.
    pub fn hydrated(user: UserIdentity) -> Self {
        let store = Self::new();
        store.dispatch(SessionAction::Hydrate(user));
        store
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&self, action: SessionAction) -> bool {
        tracing::trace!(?action, "dispatch");
        let mut state = self.inner.write();
        let before = state.clone();
        state.apply(action);
        *state != before
    }

    /// Run a closure against the current state under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn snapshot(&self) -> AppState {
        self.inner.read().clone()
    }

    // ==================== SELECTORS ====================

    pub fn user(&self) -> Option<UserIdentity> {
        self.read(|s| s.user.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.read(|s| s.user.as_ref().map(|u| u.id.clone()))
    }

    pub fn is_logged_in(&self) -> bool {
        self.read(|s| s.user.as_ref().is_some_and(|u| u.is_logged_in))
    }

    pub fn connected_address(&self) -> Option<String> {
        self.read(|s| s.connection.connected_address.clone())
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.read(|s| s.connection.connection_status)
    }

    pub fn connection_error(&self) -> Option<String> {
        self.read(|s| s.connection.connection_error.clone())
    }

    pub fn provider_detected(&self) -> bool {
        self.read(|s| s.connection.provider_detected)
    }

    pub fn is_wallet_verified(&self) -> bool {
        self.read(|s| s.connection.wallet_verified)
    }

    pub fn is_verifying(&self) -> bool {
        self.read(|s| s.connection.verifying)
    }

    pub fn pending_login(&self) -> Option<PendingLogin> {
        self.read(|s| s.connection.pending_login.clone())
    }

    pub fn link_error(&self) -> Option<String> {
        self.read(|s| s.connection.link_error.clone())
    }

    pub fn link_phase(&self) -> LinkPhase {
        self.read(|s| s.connection.link_phase())
    }

    pub fn primary_wallet(&self) -> Option<WalletLink> {
        self.read(|s| s.user.as_ref().and_then(|u| u.primary_wallet().cloned()))
    }

    /// Identity id and connected address, as captured before a request.
    pub(crate) fn identity_and_address(&self) -> (Option<String>, Option<String>) {
        self.read(|s| {
            (
                s.user.as_ref().map(|u| u.id.clone()),
                s.connection.connected_address.clone(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_reports_change() {
        let store = SessionStore::new();
        assert!(store.dispatch(SessionAction::ProviderDetected(true)));
        assert!(!store.dispatch(SessionAction::ProviderDetected(true)));
        assert!(store.provider_detected());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();
        store.dispatch(SessionAction::UserLoaded(UserIdentity::new("U1")));
        store.dispatch(SessionAction::ConnectionSucceeded {
            address: "TAddr1".to_string(),
        });

        assert_eq!(other.user_id().as_deref(), Some("U1"));
        assert_eq!(other.connected_address().as_deref(), Some("TAddr1"));
        assert_eq!(other.connection_status(), ConnectionStatus::Connected);
        assert_eq!(other.link_phase(), LinkPhase::ConnectedUnverified);
    }

    #[test]
    fn test_hydrated_store() {
        let store = SessionStore::hydrated(UserIdentity::new("U1"));
        assert_eq!(store.user_id().as_deref(), Some("U1"));
        assert!(!store.is_logged_in());
        assert_eq!(store.connection_status(), ConnectionStatus::Idle);
    }
}

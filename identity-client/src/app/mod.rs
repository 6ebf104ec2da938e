//! # Application Layer
//!
//! State, the runners that mutate it, and [`IdentityClient`], which wires them
//! together for one browsing session.
//!
//! ## Module Structure
//!
//! ```text
//! app/
//! ├── mod.rs       - IdentityClient facade
//! ├── state.rs     - AppState, SessionAction, pure reducer
//! ├── store.rs     - SessionStore handle and selectors
//! ├── events.rs    - ClientEvent notifications
//! ├── identity.rs  - user id persistence and bootstrap
//! ├── linker/      - connect / verify state machine runner
//! └── session.rs   - page-view session tracker
//! ```

pub mod events;
pub mod identity;
pub mod linker;
pub mod session;
pub mod state;
pub mod store;

use std::sync::Arc;

use async_channel::Receiver;
use shared::UserIdentity;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::core::error::{LinkError, Result};
use crate::core::service::{IdentityApi, ProviderGateway};
use crate::provider::{ConnectionManager, PollOutcome, ProviderDetector};

pub use events::{ClientEvent, EventSink, NoticeLevel};
pub use identity::{bootstrap_identity, FileStorage, IdentityStore, KeyValueStorage, MemoryStorage};
pub use linker::{IdentityLinker, LinkOutcome, VerifyOutcome};
pub use session::{SessionContext, SessionTracker};
pub use state::{AppState, ConnectionStatus, LinkPhase, SessionAction};
pub use store::SessionStore;

/// One browsing session: identity, wallet link and page-view tracking.
pub struct IdentityClient {
    api: Arc<dyn IdentityApi>,
    store: SessionStore,
    identity: IdentityStore,
    detector: ProviderDetector,
    linker: IdentityLinker,
    tracker: SessionTracker,
}

impl IdentityClient {
    /// Build the client and the receiver for its UI notifications.
    pub fn new(
        config: &ClientConfig,
        api: Arc<dyn IdentityApi>,
        gateway: Arc<dyn ProviderGateway>,
        identity: IdentityStore,
    ) -> (Self, Receiver<ClientEvent>) {
        let store = SessionStore::new();
        let (events, rx) = EventSink::channel();

        let detector = ProviderDetector::from_config(gateway.clone(), store.clone(), config);
        let connection = ConnectionManager::new(gateway, store.clone(), events.clone());
        let linker = IdentityLinker::new(api.clone(), connection, store.clone(), events)
            .with_identity_store(identity.clone());
        let tracker = SessionTracker::new(api.clone())
            .with_cookies(identity.cookies().clone())
            .with_heartbeat_interval(config.heartbeat_interval());

        let client = Self {
            api,
            store,
            identity,
            detector,
            linker,
            tracker,
        };
        (client, rx)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn linker(&self) -> &IdentityLinker {
        &self.linker
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// Load or create the identity, then pick up a wallet the provider
    /// already exposes.
    pub async fn bootstrap(&self) -> Result<UserIdentity> {
        let user = bootstrap_identity(&self.identity, self.api.as_ref(), &self.store).await?;
        self.detector.detect();
        if self.linker.connection().check_existing().is_some() {
            // Link failures were already surfaced as notices
            if let Err(err) = self.linker.link_connected_wallet().await {
                tracing::warn!(error = %err, "Linking the pre-authorised wallet failed");
            }
        }
        Ok(user)
    }

    /// Poll for a late-injected provider in the background.
    pub fn start_detection(&self) -> JoinHandle<PollOutcome> {
        self.detector.spawn()
    }

    /// Start page-view tracking for the current identity.
    pub async fn start_session(&self, context: SessionContext) -> bool {
        match self.store.user_id() {
            Some(user_id) => self.tracker.start(&user_id, context).await,
            None => false,
        }
    }

    pub async fn connect_wallet(&self) -> std::result::Result<LinkOutcome, LinkError> {
        self.linker.connect_wallet().await
    }

    /// Verify the connected wallet. After an identity swap, tracking moves to
    /// the adopted identity.
    pub async fn verify_wallet(&self, context: SessionContext) -> std::result::Result<VerifyOutcome, LinkError> {
        let outcome = self.linker.verify_wallet().await?;
        if let VerifyOutcome::IdentitySwapped { current, .. } = &outcome {
            if self.tracker.is_active() {
                self.tracker.start(current, context).await;
            }
        }
        Ok(outcome)
    }

    /// Log out, drop the wallet connection and stop the heartbeat.
    pub async fn logout(&self) -> std::result::Result<(), LinkError> {
        self.linker.logout().await?;
        self.tracker.stop();
        Ok(())
    }

    /// Page teardown: end the tracked session.
    pub async fn shutdown(&self) {
        self.tracker.end().await;
    }
}

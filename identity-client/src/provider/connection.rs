//! # Connection Manager
//!
//! Requests account access from the provider and normalises the outcome into
//! [`ConnectionStatus`] plus a user-facing error string.
//!
//! Provider answer codes:
//!
//! | code | outcome |
//! |---|---|
//! | 200 | success |
//! | 4000 | [`ConnectionError::RequestPending`] |
//! | 4001 | [`ConnectionError::UserRejected`] |
//! | none | [`ConnectionError::ProviderLocked`] |
//! | other | [`ConnectionError::UnknownProvider`] |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lib_utils::validate_address;

use crate::app::events::{EventSink, NoticeLevel};
use crate::app::state::SessionAction;
use crate::app::store::SessionStore;
use crate::core::error::ConnectionError;
use crate::core::service::{AccountsResponse, ProviderGateway};

pub const CODE_OK: i64 = 200;
pub const CODE_REQUEST_PENDING: i64 = 4000;
pub const CODE_USER_REJECTED: i64 = 4001;

/// The provider's current address, if it is a well-formed base58 address.
///
/// Addresses end up in backend URL paths, so anything else counts as absent.
pub(crate) fn exposed_address(gateway: &dyn ProviderGateway) -> Option<String> {
    let address = gateway.default_address()?;
    match validate_address(&address) {
        Ok(()) => Some(address),
        Err(reason) => {
            tracing::warn!(reason = %reason, "Ignoring malformed provider address");
            None
        }
    }
}

/// Map a provider account-request answer to success or a typed failure.
pub fn classify_response(response: &AccountsResponse) -> Result<(), ConnectionError> {
    match response.code {
        Some(CODE_OK) => Ok(()),
        Some(CODE_REQUEST_PENDING) => Err(ConnectionError::RequestPending),
        Some(CODE_USER_REJECTED) => Err(ConnectionError::UserRejected),
        None => Err(ConnectionError::ProviderLocked),
        Some(code) => Err(ConnectionError::UnknownProvider(
            response
                .message
                .clone()
                .unwrap_or_else(|| format!("unexpected response code {}", code)),
        )),
    }
}

pub struct ConnectionManager {
    gateway: Arc<dyn ProviderGateway>,
    store: SessionStore,
    events: EventSink,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however `connect()` returns.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectionManager {
    pub fn new(gateway: Arc<dyn ProviderGateway>, store: SessionStore, events: EventSink) -> Self {
        Self {
            gateway,
            store,
            events,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn ProviderGateway> {
        &self.gateway
    }

    /// Request account access and record the outcome in the store.
    ///
    /// Failures are recorded as `connection_status = error` plus
    /// `connection_error`, emitted as a notice, and returned as values.
    /// A call made while another is outstanding returns
    /// [`ConnectionError::InProgress`] and leaves state untouched.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> Result<String, ConnectionError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Connect ignored: request already outstanding");
            return Err(ConnectionError::InProgress);
        }
        let _guard = InFlight(&self.in_flight);

        match self.try_connect().await {
            Ok(address) => {
                tracing::info!(address = %address, "Wallet connected");
                self.store.dispatch(SessionAction::ConnectionSucceeded {
                    address: address.clone(),
                });
                Ok(address)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Wallet connection failed");
                self.store.dispatch(SessionAction::ConnectionFailed {
                    message: err.to_string(),
                });
                self.events.notify(NoticeLevel::Error, err.to_string());
                Err(err)
            }
        }
    }

    async fn try_connect(&self) -> Result<String, ConnectionError> {
        if !self.gateway.detect() {
            return Err(ConnectionError::ProviderNotDetected);
        }

        // Site already authorised: no prompt needed
        if let Some(address) = exposed_address(self.gateway.as_ref()) {
            tracing::debug!("Provider already exposes an address");
            return Ok(address);
        }

        self.store.dispatch(SessionAction::ConnectionRequested);
        let response = self.gateway.request_accounts().await;
        classify_response(&response)?;

        exposed_address(self.gateway.as_ref()).ok_or(ConnectionError::AddressUnavailable)
    }

    /// Pick up an address the provider already exposes, without prompting.
    pub fn check_existing(&self) -> Option<String> {
        self.store.dispatch(SessionAction::ConnectionChecking);

        let address = if self.gateway.detect() {
            exposed_address(self.gateway.as_ref())
        } else {
            None
        };

        match &address {
            Some(address) => {
                self.store.dispatch(SessionAction::ConnectionSucceeded {
                    address: address.clone(),
                });
            }
            None => {
                self.store.dispatch(SessionAction::ConnectionCheckFinished);
            }
        }
        address
    }

    /// Clear local connection state. The provider's own authorisation for
    /// this site is untouched.
    pub fn disconnect(&self) {
        tracing::info!("Wallet disconnected");
        self.store.dispatch(SessionAction::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::ConnectionStatus;
    use crate::test_support::FakeGateway;

    fn setup(gateway: Arc<FakeGateway>) -> (ConnectionManager, SessionStore) {
        let store = SessionStore::new();
        let manager = ConnectionManager::new(gateway, store.clone(), EventSink::disabled());
        (manager, store)
    }

    #[test]
    fn test_classify_response_codes() {
        assert_eq!(classify_response(&AccountsResponse::with_code(200)), Ok(()));
        assert_eq!(
            classify_response(&AccountsResponse::with_code(4000)),
            Err(ConnectionError::RequestPending)
        );
        assert_eq!(
            classify_response(&AccountsResponse::with_code(4001)),
            Err(ConnectionError::UserRejected)
        );
        assert_eq!(
            classify_response(&AccountsResponse::default()),
            Err(ConnectionError::ProviderLocked)
        );
        assert_eq!(
            classify_response(&AccountsResponse {
                code: Some(500),
                message: Some("internal".to_string()),
            }),
            Err(ConnectionError::UnknownProvider("internal".to_string()))
        );
    }

    #[tokio::test]
    async fn test_provider_absent() {
        let gateway = Arc::new(FakeGateway::absent());
        let (manager, store) = setup(gateway.clone());

        let result = manager.connect().await;

        assert_eq!(result, Err(ConnectionError::ProviderNotDetected));
        assert_eq!(store.connection_status(), ConnectionStatus::Error);
        assert!(store
            .connection_error()
            .unwrap()
            .starts_with("TronLink wallet not detected"));
        assert_eq!(store.connected_address(), None);
        assert_eq!(gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn test_user_rejected() {
        let gateway = Arc::new(FakeGateway::present(None).with_response(AccountsResponse::with_code(4001)));
        let (manager, store) = setup(gateway);

        assert_eq!(manager.connect().await, Err(ConnectionError::UserRejected));
        assert_eq!(store.connection_status(), ConnectionStatus::Error);
        assert!(store.connection_error().unwrap().contains("rejected"));
    }

    #[tokio::test]
    async fn test_already_authorised_skips_prompt() {
        let gateway = Arc::new(FakeGateway::present(Some("TAddr1")));
        let (manager, store) = setup(gateway.clone());

        assert_eq!(manager.connect().await.unwrap(), "TAddr1");
        assert_eq!(gateway.request_count(), 0);
        assert_eq!(store.connection_status(), ConnectionStatus::Connected);
        assert_eq!(store.connected_address().as_deref(), Some("TAddr1"));
    }

    #[tokio::test]
    async fn test_prompt_then_address() {
        let gateway = Arc::new(
            FakeGateway::present(None)
                .with_response(AccountsResponse::with_code(200))
                .authorize_on_request("TAddr1"),
        );
        let (manager, store) = setup(gateway.clone());

        assert_eq!(manager.connect().await.unwrap(), "TAddr1");
        assert_eq!(gateway.request_count(), 1);
        assert_eq!(store.connected_address().as_deref(), Some("TAddr1"));
        assert_eq!(store.connection_error(), None);
    }

    #[tokio::test]
    async fn test_success_without_address() {
        let gateway = Arc::new(FakeGateway::present(None).with_response(AccountsResponse::with_code(200)));
        let (manager, store) = setup(gateway);

        assert_eq!(manager.connect().await, Err(ConnectionError::AddressUnavailable));
        assert_eq!(store.connection_status(), ConnectionStatus::Error);
    }

    #[tokio::test]
    async fn test_locked_provider_notifies() {
        let gateway = Arc::new(FakeGateway::present(None).with_response(AccountsResponse::default()));
        let store = SessionStore::new();
        let (events, rx) = EventSink::channel();
        let manager = ConnectionManager::new(gateway, store, events);

        assert_eq!(manager.connect().await, Err(ConnectionError::ProviderLocked));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_check_existing() {
        let (manager, store) = setup(Arc::new(FakeGateway::present(None)));
        assert_eq!(manager.check_existing(), None);
        assert_eq!(store.connection_status(), ConnectionStatus::Idle);

        let (manager, store) = setup(Arc::new(FakeGateway::present(Some("TAddr1"))));
        assert_eq!(manager.check_existing().as_deref(), Some("TAddr1"));
        assert_eq!(store.connection_status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_malformed_address_is_unavailable() {
        let gateway = Arc::new(
            FakeGateway::present(Some("TAddr1/../admin")).with_response(AccountsResponse::with_code(200)),
        );
        let (manager, store) = setup(gateway.clone());

        assert_eq!(manager.connect().await, Err(ConnectionError::AddressUnavailable));
        assert_eq!(gateway.request_count(), 1);
        assert_eq!(store.connected_address(), None);
        assert_eq!(store.connection_status(), ConnectionStatus::Error);

        assert_eq!(manager.check_existing(), None);
        assert_eq!(store.connected_address(), None);
    }

    #[tokio::test]
    async fn test_disconnect_resets_state() {
        let (manager, store) = setup(Arc::new(FakeGateway::present(Some("TAddr1"))));
        manager.connect().await.unwrap();

        manager.disconnect();

        assert_eq!(store.connected_address(), None);
        assert_eq!(store.connection_status(), ConnectionStatus::Idle);
        assert!(!store.is_wallet_verified());
    }
}

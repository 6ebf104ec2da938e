//! In-memory fakes for [`IdentityApi`] and [`ProviderGateway`], shared by the
//! unit tests of the linker, detector, connection manager and tracker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::{
    ConnectWalletResponse, LinkWalletRequest, LinkWalletResponse, SessionSnapshot,
    SessionStartRequest, UnlinkWalletRequest, UserIdentity, WalletLink,
};
use tokio::sync::Notify;

use crate::core::error::ApiError;
use crate::core::service::{AccountsResponse, IdentityApi, ProviderGateway};

// ==================== PROVIDER ====================

pub struct FakeGateway {
    present: AtomicBool,
    address: Mutex<Option<String>>,
    response: Mutex<AccountsResponse>,
    authorize_on_request: Mutex<Option<String>>,
    signing: bool,
    sign_result: Mutex<Result<String, String>>,
    requests: AtomicUsize,
    detects: AtomicUsize,
    pub signed_messages: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn absent() -> Self {
        Self::build(false, None)
    }

    pub fn present(address: Option<&str>) -> Self {
        Self::build(true, address)
    }

    fn build(present: bool, address: Option<&str>) -> Self {
        Self {
            present: AtomicBool::new(present),
            address: Mutex::new(address.map(str::to_string)),
            response: Mutex::new(AccountsResponse::with_code(200)),
            authorize_on_request: Mutex::new(None),
            signing: true,
            sign_result: Mutex::new(Ok("fake-signature".to_string())),
            requests: AtomicUsize::new(0),
            detects: AtomicUsize::new(0),
            signed_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, response: AccountsResponse) -> Self {
        *self.response.lock() = response;
        self
    }

    /// Expose `address` once the account request is answered.
    pub fn authorize_on_request(self, address: &str) -> Self {
        *self.authorize_on_request.lock() = Some(address.to_string());
        self
    }

    pub fn without_signing(mut self) -> Self {
        self.signing = false;
        self
    }

    pub fn with_sign_result(self, result: Result<String, String>) -> Self {
        *self.sign_result.lock() = result;
        self
    }

    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    pub fn set_address(&self, address: Option<&str>) {
        *self.address.lock() = address.map(str::to_string);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn detect_count(&self) -> usize {
        self.detects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    fn detect(&self) -> bool {
        self.detects.fetch_add(1, Ordering::SeqCst);
        self.present.load(Ordering::SeqCst)
    }

    fn default_address(&self) -> Option<String> {
        self.address.lock().clone()
    }

    async fn request_accounts(&self) -> AccountsResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(address) = self.authorize_on_request.lock().clone() {
            *self.address.lock() = Some(address);
        }
        self.response.lock().clone()
    }

    fn supports_signing(&self) -> bool {
        self.signing
    }

    async fn sign_message(&self, message: &str) -> Result<String, String> {
        self.signed_messages.lock().push(message.to_string());
        self.sign_result.lock().clone()
    }
}

// ==================== BACKEND ====================

pub fn wallet(address: &str, verified: bool) -> WalletLink {
    WalletLink {
        address: address.to_string(),
        linked_at: Utc::now(),
        verified,
        is_primary: false,
        last_used: Utc::now(),
        label: None,
    }
}

/// Backend fake. Without scripted answers it behaves like a cooperative
/// server: connect adds an unverified wallet, verify marks it verified.
#[derive(Default)]
pub struct FakeApi {
    pub users: Mutex<HashMap<String, UserIdentity>>,
    pub connect_response: Mutex<Option<Result<ConnectWalletResponse, ApiError>>>,
    pub link_response: Mutex<Option<Result<LinkWalletResponse, ApiError>>>,
    pub login_error: Mutex<Option<ApiError>>,
    /// When set, `link_wallet` waits for a notification before answering.
    pub link_gate: Mutex<Option<Arc<Notify>>>,
    pub fail_sessions: AtomicBool,
    pub beacon_supported: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    pub link_requests: Mutex<Vec<LinkWalletRequest>>,
    pub pages: Mutex<Vec<String>>,
    pub session_starts: Mutex<Vec<SessionStartRequest>>,
    pub ended_sessions: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: UserIdentity) -> Self {
        self.users.lock().insert(user.id.clone(), user);
        self
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    fn session_result(&self) -> Result<(), ApiError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            Err(ApiError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn user_entry(&self, user_id: &str) -> UserIdentity {
        self.users
            .lock()
            .entry(user_id.to_string())
            .or_insert_with(|| UserIdentity::new(user_id))
            .clone()
    }

    fn update_user(&self, user_id: &str, f: impl FnOnce(&mut UserIdentity)) -> UserIdentity {
        let mut users = self.users.lock();
        let user = users
            .entry(user_id.to_string())
            .or_insert_with(|| UserIdentity::new(user_id));
        f(user);
        user.clone()
    }
}

#[async_trait]
impl IdentityApi for FakeApi {
    async fn fetch_user(&self, user_id: &str) -> Result<UserIdentity, ApiError> {
        self.record("fetch_user");
        Ok(self.user_entry(user_id))
    }

    async fn connect_wallet(&self, user_id: &str, address: &str) -> Result<ConnectWalletResponse, ApiError> {
        self.record("connect_wallet");
        if let Some(scripted) = self.connect_response.lock().clone() {
            return scripted;
        }

        let user = self.update_user(user_id, |u| {
            if !u.has_wallet(address) {
                u.wallets.push(wallet(address, false));
            }
        });
        Ok(ConnectWalletResponse {
            success: true,
            user: Some(user),
            login_required: false,
            existing_user_id: None,
            message: None,
        })
    }

    async fn link_wallet(&self, user_id: &str, request: &LinkWalletRequest) -> Result<LinkWalletResponse, ApiError> {
        self.record("link_wallet");
        self.link_requests.lock().push(request.clone());

        let gate = self.link_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(scripted) = self.link_response.lock().clone() {
            return scripted;
        }

        let user = self.update_user(user_id, |u| {
            match u.wallets.iter_mut().find(|w| w.address == request.address) {
                Some(w) => w.verified = true,
                None => u.wallets.push(wallet(&request.address, true)),
            }
        });
        Ok(LinkWalletResponse {
            user,
            identity_swapped: false,
            previous_user_id: None,
        })
    }

    async fn unlink_wallet(
        &self,
        user_id: &str,
        address: &str,
        _request: &UnlinkWalletRequest,
    ) -> Result<UserIdentity, ApiError> {
        self.record("unlink_wallet");
        Ok(self.update_user(user_id, |u| u.wallets.retain(|w| w.address != address)))
    }

    async fn set_primary_wallet(&self, user_id: &str, address: &str) -> Result<UserIdentity, ApiError> {
        self.record("set_primary_wallet");
        Ok(self.update_user(user_id, |u| {
            for w in &mut u.wallets {
                w.is_primary = w.address == address;
            }
        }))
    }

    async fn login(&self, user_id: &str) -> Result<UserIdentity, ApiError> {
        self.record("login");
        if let Some(err) = self.login_error.lock().clone() {
            return Err(err);
        }
        Ok(self.update_user(user_id, |u| u.is_logged_in = true))
    }

    async fn logout(&self, user_id: &str) -> Result<UserIdentity, ApiError> {
        self.record("logout");
        Ok(self.update_user(user_id, |u| u.is_logged_in = false))
    }

    async fn start_session(&self, _user_id: &str, request: &SessionStartRequest) -> Result<SessionSnapshot, ApiError> {
        self.record("start_session");
        self.session_starts.lock().push(request.clone());
        self.session_result()?;
        Ok(SessionSnapshot::default())
    }

    async fn record_page(&self, _user_id: &str, path: &str) -> Result<(), ApiError> {
        self.record("record_page");
        self.pages.lock().push(path.to_string());
        self.session_result()
    }

    async fn heartbeat(&self, _user_id: &str) -> Result<(), ApiError> {
        self.record("heartbeat");
        self.session_result()
    }

    async fn end_session(&self, user_id: &str) -> Result<(), ApiError> {
        self.record("end_session");
        self.ended_sessions.lock().push(user_id.to_string());
        self.session_result()
    }

    fn send_end_beacon(&self, _user_id: &str) -> bool {
        if self.beacon_supported.load(Ordering::SeqCst) {
            self.record("end_beacon");
            true
        } else {
            false
        }
    }
}

//! # Application State Types
//!
//! The client-local state of one browsing session and the pure transition
//! function over it. Every mutation goes through [`AppState::apply`]; the
//! side effects (provider calls, backend calls) live in the runners that
//! dispatch these actions.

use shared::UserIdentity;

/// Connection status of the wallet provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    /// Looking for an address the provider already exposes.
    Checking,
    /// Account request outstanding (prompt may be open).
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Checking => "checking",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

/// The connected address is verified by another identity; signing in would
/// adopt that identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub address: String,
    pub existing_owner: String,
}

/// Linker state derived from [`ConnectionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkPhase {
    Unlinked,
    ConnectedUnverified,
    Verified,
    LoginRequired { existing_owner: String },
}

/// Ephemeral wallet connection state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub connected_address: Option<String>,
    pub connection_status: ConnectionStatus,
    pub provider_detected: bool,
    pub connection_error: Option<String>,
    pub wallet_verified: bool,
    pub pending_login: Option<PendingLogin>,
    /// A verification request is in flight.
    pub verifying: bool,
    /// Last recoverable linker error, cleared by the next attempt.
    pub link_error: Option<String>,
}

impl ConnectionState {
    pub fn link_phase(&self) -> LinkPhase {
        if let Some(pending) = &self.pending_login {
            return LinkPhase::LoginRequired {
                existing_owner: pending.existing_owner.clone(),
            };
        }

        match (&self.connected_address, self.wallet_verified) {
            (None, _) => LinkPhase::Unlinked,
            (Some(_), true) => LinkPhase::Verified,
            (Some(_), false) => LinkPhase::ConnectedUnverified,
        }
    }

    /// Everything tied to the live provider session, reset in one step.
    fn reset_connection(&mut self) {
        self.connected_address = None;
        self.connection_status = ConnectionStatus::Idle;
        self.connection_error = None;
        self.wallet_verified = false;
        self.pending_login = None;
        self.verifying = false;
        self.link_error = None;
    }
}

/// Whole client state: the active identity plus the connection cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub user: Option<UserIdentity>,
    pub connection: ConnectionState,
}

/// The complete set of state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Server-rendered snapshot; avoids a disconnected first paint.
    Hydrate(UserIdentity),
    /// Fresh record from the backend for the current identity.
    UserLoaded(UserIdentity),
    ProviderDetected(bool),
    ConnectionChecking,
    ConnectionCheckFinished,
    ConnectionRequested,
    ConnectionSucceeded { address: String },
    ConnectionFailed { message: String },
    Disconnected,
    /// Backend stored the connected address as an unverified link.
    WalletConnected { user: Option<UserIdentity> },
    WalletLinkFailed { message: String },
    LoginRequired { address: String, existing_owner: String },
    VerificationStarted,
    /// Signature accepted. `user` may be a different identity (swap).
    VerificationSucceeded { user: UserIdentity },
    VerificationFailed { message: String },
    LoginCancelled,
    LoggedIn(UserIdentity),
    LoggedOut(UserIdentity),
}

impl AppState {
    /// Apply one action. Deterministic, no I/O.
    pub fn apply(&mut self, action: SessionAction) {
        let conn = &mut self.connection;

        match action {
            SessionAction::Hydrate(user) => {
                match user.primary_wallet() {
                    Some(primary) => {
                        conn.connected_address = Some(primary.address.clone());
                        conn.connection_status = ConnectionStatus::Connected;
                        conn.wallet_verified = primary.verified;
                    }
                    None => {
                        conn.connected_address = None;
                        conn.connection_status = ConnectionStatus::Idle;
                        conn.wallet_verified = false;
                    }
                }
                conn.provider_detected = false;
                conn.connection_error = None;
                conn.pending_login = None;
                self.user = Some(user);
            }
            SessionAction::UserLoaded(user) => {
                if self.user.as_ref().is_some_and(|u| u.id != user.id) {
                    // Another identity: its verification starts from scratch
                    conn.verifying = false;
                }
                if let Some(address) = &conn.connected_address {
                    conn.wallet_verified = user.is_wallet_verified(address);
                }
                self.user = Some(user);
            }
            SessionAction::ProviderDetected(detected) => {
                conn.provider_detected = detected;
            }
            SessionAction::ConnectionChecking => {
                conn.connection_status = ConnectionStatus::Checking;
            }
            SessionAction::ConnectionCheckFinished => {
                if conn.connection_status == ConnectionStatus::Checking {
                    conn.connection_status = if conn.connected_address.is_some() {
                        ConnectionStatus::Connected
                    } else {
                        ConnectionStatus::Idle
                    };
                }
            }
            SessionAction::ConnectionRequested => {
                conn.connection_status = ConnectionStatus::Connecting;
                conn.connection_error = None;
            }
            SessionAction::ConnectionSucceeded { address } => {
                if conn.connected_address.as_deref() != Some(address.as_str()) {
                    // A different wallet: nothing pending carries over
                    conn.pending_login = None;
                    conn.verifying = false;
                    conn.link_error = None;
                }
                conn.wallet_verified = self
                    .user
                    .as_ref()
                    .is_some_and(|u| u.is_wallet_verified(&address));
                conn.connected_address = Some(address);
                conn.connection_status = ConnectionStatus::Connected;
                conn.connection_error = None;
            }
            SessionAction::ConnectionFailed { message } => {
                conn.connection_status = ConnectionStatus::Error;
                conn.connection_error = Some(message);
            }
            SessionAction::Disconnected | SessionAction::LoginCancelled => {
                conn.reset_connection();
            }
            SessionAction::WalletConnected { user } => {
                if let Some(user) = user {
                    conn.wallet_verified = conn
                        .connected_address
                        .as_deref()
                        .is_some_and(|a| user.is_wallet_verified(a));
                    self.user = Some(user);
                } else {
                    conn.wallet_verified = false;
                }
                conn.pending_login = None;
                conn.link_error = None;
            }
            SessionAction::WalletLinkFailed { message } => {
                conn.link_error = Some(message);
            }
            SessionAction::LoginRequired { address, existing_owner } => {
                conn.pending_login = Some(PendingLogin { address, existing_owner });
                conn.wallet_verified = false;
                conn.link_error = None;
            }
            SessionAction::VerificationStarted => {
                conn.verifying = true;
                conn.link_error = None;
            }
            SessionAction::VerificationSucceeded { user } => {
                conn.verifying = false;
                conn.wallet_verified = true;
                conn.pending_login = None;
                conn.link_error = None;
                self.user = Some(user);
            }
            SessionAction::VerificationFailed { message } => {
                conn.verifying = false;
                conn.link_error = Some(message);
            }
            SessionAction::LoggedIn(user) | SessionAction::LoggedOut(user) => {
                self.user = Some(user);
            }
        }
    }
}

//! # Common Error Types
//!
//! Consolidated error handling for the identity client.
//!
//! Nothing in this crate is fatal: every error here describes something the
//! user can retry, or something that is logged and ignored.
//!
//! ## Error Categories
//!
//! - [`ConnectionError`]: provider interaction (locked, rejected, pending, unknown)
//! - [`LinkError`]: identity linker transitions (connect, verify, login, logout)
//! - [`ApiError`]: backend HTTP communication (network, status, decoding)
//! - [`StorageError`]: identity id persistence (cookie / local storage analogues)
//! - [`ConfigError`]: configuration loading and validation
//! - [`AppError`]: umbrella type for the binary and the bootstrap path
//!
//! ## Usage Pattern
//!
//! ```rust,no_run
//! use identity_client::core::error::{ConnectionError, LinkError};
//!
//! let err = ConnectionError::UserRejected;
//! assert_eq!(err.to_string(), "Connection request was rejected in TronLink");
//!
//! let err = LinkError::VerifyFailed("Invalid signature".to_string());
//! assert!(err.is_recoverable());
//! ```

use thiserror::Error;

/// Provider-interaction failures surfaced by the Connection Manager.
///
/// The `Display` text is what ends up in `connection_error`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("TronLink wallet not detected. Please install the TronLink extension and refresh the page.")]
    ProviderNotDetected,

    /// Provider code 4000: another authorisation prompt is already open.
    #[error("A connection request is already pending in TronLink. Please check the extension.")]
    RequestPending,

    /// Provider code 4001.
    #[error("Connection request was rejected in TronLink")]
    UserRejected,

    /// Provider answered without a code, which is what a locked wallet does.
    #[error("TronLink is locked. Please unlock your wallet and try again.")]
    ProviderLocked,

    #[error("TronLink error: {0}")]
    UnknownProvider(String),

    /// Authorisation succeeded but no active address could be read.
    #[error("Connected to TronLink but no wallet address is available")]
    AddressUnavailable,

    /// A `connect()` call is already outstanding; state was not touched.
    #[error("A connection attempt is already in progress")]
    InProgress,
}

/// Identity linker failures. All recoverable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Failed to connect wallet: {0}")]
    ConnectFailed(String),

    #[error("Failed to verify wallet: {0}")]
    VerifyFailed(String),

    /// The provider cannot sign messages.
    #[error("Wallet does not support message signing")]
    SignatureUnavailable,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Logout failed: {0}")]
    LogoutFailed(String),

    /// Unlink or set-primary rejected.
    #[error("Failed to update wallet: {0}")]
    WalletUpdateFailed(String),

    #[error("No user identity is loaded")]
    NoIdentity,

    #[error("No wallet is connected")]
    NoConnectedWallet,
}

impl LinkError {
    /// Every linker error leaves the session usable; the user may retry.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Backend API communication error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, timeout, DNS failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx answer; `message` is taken from the error body when present.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Message suitable for inline display.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Identity id persistence error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Configuration loading / validation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} has an invalid format")]
    Env(String),

    #[error("Invalid configuration file: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<lib_utils::envs::Error> for ConfigError {
    fn from(err: lib_utils::envs::Error) -> Self {
        match err {
            lib_utils::envs::Error::MissingEnv(name) | lib_utils::envs::Error::WrongFormat(name) => {
                ConfigError::Env(name.to_string())
            }
        }
    }
}

/// Application-wide error type covering the bootstrap path and the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

//! # Core Abstractions
//!
//! Error types and service traits used throughout the identity client.
//!
//! - **[`error`]**: error taxonomy (`ConnectionError`, `LinkError`, `ApiError`, ...)
//! - **[`service`]**: dependency-injection traits (`IdentityApi`, `ProviderGateway`)
//!
//! ## Dependency Injection
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use identity_client::core::service::IdentityApi;
//! use identity_client::services::api::ApiClient;
//!
//! // In production: the reqwest client
//! let api: Arc<dyn IdentityApi> = Arc::new(ApiClient::new("http://127.0.0.1:3001").unwrap());
//! ```

pub mod error;
pub mod service;

pub use error::{ApiError, AppError, ConfigError, ConnectionError, LinkError, Result, StorageError};
pub use service::{AccountsResponse, IdentityApi, ProviderGateway};

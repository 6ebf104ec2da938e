//! # Wallet Identity Client - Library Root
//!
//! Client-side coordination layer that links an anonymous visitor identity to
//! browser-extension wallets and tracks page-view sessions for it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              identity-client (this crate)                │
//! ├──────────────────────────────────────────────────────────┤
//! │  ProviderDetector ─▶ ConnectionManager ─▶ IdentityLinker  │
//! │                                               │          │
//! │                         SessionStore ◀────────┘          │
//! │  SessionTracker (keyed by the same identity)             │
//! └──────────────────────────────────────────────────────────┘
//!          │                              │
//!          │ ProviderGateway              │ HTTP (reqwest)
//!          ▼                              ▼
//! ┌─────────────────┐          ┌─────────────────────────┐
//! │ Wallet provider │          │ Backend identity service│
//! │ (extension/key) │          │ /user/{id}/...          │
//! └─────────────────┘          └─────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - **app**: state, store, linker, session tracker, identity persistence
//! - **provider**: provider detection, account requests, local key provider
//! - **services**: backend HTTP client
//! - **core**: error taxonomy and the service traits
//! - **config**: typed client configuration
//! - **debug**: file-based logging
//!
//! ## Flow
//!
//! 1. `IdentityClient::bootstrap` loads or creates the user id and its record
//! 2. The detector polls for the provider; the connection manager requests accounts
//! 3. The linker stores the address unverified, then verifies it on request
//! 4. The tracker reports page views and heartbeats until `shutdown`

pub mod app;
pub mod config;
pub mod core;
pub mod debug;
pub mod provider;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::IdentityClient;
pub use config::ClientConfig;

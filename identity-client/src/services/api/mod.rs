//! # Backend API Client Module
//!
//! HTTP client for the backend identity service.
//!
//! ## Module Structure
//!
//! ```text
//! api/
//! ├── mod.rs      - Module exports
//! ├── client.rs   - ApiClient, status handling, IdentityApi impl
//! ├── user.rs     - fetch-or-create, login, logout
//! ├── wallet.rs   - connect, verify, unlink, primary
//! └── session.rs  - start, page, heartbeat, end, end beacon
//! ```

pub mod client;
pub mod session;
pub mod user;
pub mod wallet;

pub use client::ApiClient;

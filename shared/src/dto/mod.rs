//! # Data Transfer Objects (DTOs)
//!
//! Data structures exchanged with the backend identity service.
//!
//! ## Module Organization
//!
//! - [`identity`] - User identity record, preferences, activity counters
//! - [`wallet`] - Wallet links and the connect / verify / unlink payloads
//! - [`session`] - Session start / page / heartbeat payloads
//!
//! ## Example JSON Communication
//!
//! ```text
//! POST /user/5b0c.../wallet/connect
//! Content-Type: application/json
//!
//! { "address": "TXYZ..." }
//! ```
//!
//! ```text
//! HTTP/1.1 200 OK
//!
//! { "success": false, "loginRequired": true, "existingUserId": "9f1e..." }
//! ```

pub mod identity;
pub mod session;
pub mod wallet;

pub use identity::*;
pub use session::*;
pub use wallet::*;

use serde::{Deserialize, Serialize};

/// Error response
///
/// Some backend routes answer with `{ "message": ... }` instead of
/// `{ "error": ... }`; both land in `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    #[serde(alias = "message")]
    pub error: String,
}

//! # Shared Data Transfer Objects Library
//!
//! This library defines the contract between the identity client and the
//! backend identity service. All DTOs use JSON serialization via `serde`.
//!
//! ## Structure
//!
//! - **[`dto`]**: Data Transfer Objects for API communication
//!   - **[`dto::identity`]**: User identity, preferences and activity records
//!   - **[`dto::wallet`]**: Wallet link records and connect/verify payloads
//!   - **[`dto::session`]**: Page-view session payloads
//! - **[`utils::truncate_address`]**: Short address form for display
//!
//! ## Wire Format
//!
//! The backend speaks camelCase JSON, so every DTO carries
//! `#[serde(rename_all = "camelCase")]`. Optional fields are omitted when
//! `None` and tolerated when absent.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shared::dto::wallet::ConnectWalletResponse;
//!
//! let body = r#"{"success":false,"loginRequired":true,"existingUserId":"U2"}"#;
//! let response: ConnectWalletResponse = serde_json::from_str(body).unwrap();
//! assert!(response.login_required);
//! ```

pub mod dto;
pub mod utils;

// Wildcard re-exports: shared is a DTO library where all exports are public API
pub use dto::*;
pub use utils::*;

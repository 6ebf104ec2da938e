//! # Logging
//!
//! File-based structured logging for the identity client.
//!
//! ## Usage
//!
//! ```rust,no_run
//! // Initialize at startup
//! identity_client::debug::init();
//!
//! tracing::info!(endpoint = "/user/{id}/wallet", duration_ms = 84, "API call completed");
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (e.g., `identity_client=debug,info`)
//! - `IDENTITY_LOG_DIR`: Log directory (default: `logs`)
//! - `IDENTITY_LOG_CONSOLE`: Mirror logs to stderr (1=on)

pub mod config;
pub mod logger;

pub use config::LogConfig;
pub use logger::{init, init_with};

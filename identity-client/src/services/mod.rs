//! # Services Module
//!
//! External service integrations.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              identity-client                 │
//! │                                              │
//! │  IdentityLinker ── SessionTracker            │
//! │        │                 │                   │
//! │        └──── ApiClient ──┘                   │
//! └──────────────────┼───────────────────────────┘
//!                    │ HTTP/JSON
//!                    ▼
//! ┌──────────────────────────────────────────────┐
//! │  Backend identity service                    │
//! │  /user/{id}                                  │
//! │  /user/{id}/wallet/*                         │
//! │  /user/{id}/session/*                        │
//! │  /user/{id}/login, /user/{id}/logout         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Errors come back as [`crate::core::error::ApiError`]; the callers decide
//! whether they surface (wallet flows) or are swallowed (session tracking).

pub mod api;

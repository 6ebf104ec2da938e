//! # Wallet Provider
//!
//! Everything that talks to the injected wallet provider.
//!
//! - **[`detector`]**: bounded polling for provider presence
//! - **[`connection`]**: account requests and error normalisation
//! - **[`local`]**: in-process ed25519 provider for the binary and tests

pub mod connection;
pub mod detector;
pub mod local;

pub use connection::{classify_response, ConnectionManager};
pub use detector::{PollOutcome, ProviderDetector};
pub use local::LocalKeyGateway;

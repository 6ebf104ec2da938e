//! # Validation Utilities
//!
//! Checks applied to identifiers read from storage or handed over by the
//! wallet provider.

use uuid::{Uuid, Version};

/// Longest address accepted from a provider.
pub const MAX_ADDRESS_LEN: usize = 64;

/// Validate a client-generated user id.
///
/// User ids are hyphenated lowercase UUID v4 strings; anything else found in
/// storage is treated as absent.
pub fn validate_user_id(value: &str) -> Result<(), String> {
    if value.len() != 36 || value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("User id must be a lowercase hyphenated UUID".to_string());
    }

    let parsed = Uuid::parse_str(value).map_err(|e| format!("Invalid user id: {}", e))?;
    if parsed.get_version() != Some(Version::Random) {
        return Err("User id must be a version 4 UUID".to_string());
    }

    Ok(())
}

/// Validate a wallet address: non-empty base58, at most [`MAX_ADDRESS_LEN`].
pub fn validate_address(address: &str) -> Result<(), String> {
    if address.is_empty() {
        return Err("Wallet address cannot be empty".to_string());
    }
    if address.len() > MAX_ADDRESS_LEN {
        return Err("Wallet address is too long".to_string());
    }

    // Base58 excludes 0, O, I and l
    let valid = address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));
    if !valid {
        return Err("Wallet address must be base58".to_string());
    }

    Ok(())
}

//! Display helpers for wallet addresses.

const HEAD: usize = 6;
const TAIL: usize = 4;

/// Shorten an address for status lines and notices: `TJRabP...RTv8`.
///
/// Addresses too short to benefit are returned unchanged.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= HEAD + TAIL + 3 {
        return address.to_string();
    }

    let head: String = chars[..HEAD].iter().collect();
    let tail: String = chars[chars.len() - TAIL..].iter().collect();
    format!("{}...{}", head, tail)
}

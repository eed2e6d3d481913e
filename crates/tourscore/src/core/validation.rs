//! Input validation for addresses, transaction hashes, and free-form text.

use std::str::FromStr;

use alloy_primitives::{Address, B256};

use crate::core::error::{AppError, AppResult};

/// Quick shape check: 0x-prefixed, 40 hex chars.
pub fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Quick shape check: 0x-prefixed, 64 hex chars.
pub fn is_tx_hash(s: &str) -> bool {
    s.len() == 66 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a user-supplied wallet address.
pub fn parse_address(s: &str) -> AppResult<Address> {
    let s = s.trim();
    if !is_address(s) {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid wallet address (expected 0x + 40 hex chars)",
            s
        )));
    }
    Address::from_str(s).map_err(|e| AppError::Validation(format!("invalid address: {}", e)))
}

/// Parse a user-supplied transaction hash.
pub fn parse_tx_hash(s: &str) -> AppResult<B256> {
    let s = s.trim();
    if !is_tx_hash(s) {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid transaction hash (expected 0x + 64 hex chars)",
            s
        )));
    }
    B256::from_str(s).map_err(|e| AppError::Validation(format!("invalid tx hash: {}", e)))
}

/// Trim and bound free-form user text (profile names, journal entries, climb
/// fields) before it goes on-chain or into the cache. Control characters are
/// stripped; anything beyond `max_len` is rejected rather than truncated so
/// the user knows what was stored.
pub fn clean_text(s: &str, what: &str, max_len: usize) -> AppResult<String> {
    let cleaned: String = s.trim().chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", what)));
    }
    if cleaned.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} is too long ({} chars max)",
            what, max_len
        )));
    }
    Ok(cleaned)
}

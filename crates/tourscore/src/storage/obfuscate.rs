//! XOR obfuscation for sensitive cache fields (climb locations, journal
//! entries). Obfuscation only: it keeps casual eyes out of the SQLite file,
//! it is not a security boundary and is documented as such.

use crate::core::error::{AppError, AppResult};

/// XOR the plaintext against the cycled key and hex-encode the result.
/// An empty key passes the text through unchanged.
pub fn obfuscate(key: &str, plaintext: &str) -> String {
    if key.is_empty() {
        return plaintext.to_string();
    }
    let xored: Vec<u8> = plaintext
        .bytes()
        .zip(key.bytes().cycle())
        .map(|(p, k)| p ^ k)
        .collect();
    hex::encode(xored)
}

/// Reverse [`obfuscate`].
pub fn reveal(key: &str, encoded: &str) -> AppResult<String> {
    if key.is_empty() {
        return Ok(encoded.to_string());
    }
    let bytes = hex::decode(encoded)
        .map_err(|e| AppError::Validation(format!("corrupt obfuscated field: {}", e)))?;
    let plain: Vec<u8> = bytes
        .into_iter()
        .zip(key.bytes().cycle())
        .map(|(b, k)| b ^ k)
        .collect();
    String::from_utf8(plain).map_err(|e| AppError::Validation(format!("corrupt obfuscated field: {}", e)))
}

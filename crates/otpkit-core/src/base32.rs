//! RFC 4648 Base32 codec for the external representation of secrets.
//!
//! Encoding is strict (uppercase alphabet, optional `=` padding). Decoding is
//! lenient the way authenticator apps expect: case-insensitive, embedded
//! whitespace ignored, trailing padding tolerated, leftover bits that do not
//! fill a whole byte discarded. Errors report the offending character
//! position only, never the character or the surrounding input.

use std::sync::OnceLock;

use data_encoding::{Encoding, Specification, BASE32, BASE32_NOPAD};
use zeroize::Zeroizing;

use crate::OtpError;

/// RFC 4648 Base32 alphabet.
pub const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Number of characters in one padded Base32 block.
const BLOCK_CHARS: usize = 8;

/// Encode bytes as unpadded uppercase Base32.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    BASE32_NOPAD.encode(data)
}

/// Encode bytes as uppercase Base32, padded with `=` to a multiple of 8.
#[must_use]
pub fn encode_padded(data: &[u8]) -> String {
    BASE32.encode(data)
}

/// Decode Base32 text into raw bytes.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` naming the 0-based character position
/// of the first character outside the alphabet.
pub fn decode(encoded: &str) -> Result<Vec<u8>, OtpError> {
    let mut symbols = Zeroizing::new(Vec::with_capacity(encoded.len()));
    for (position, c) in content(encoded).chars().enumerate() {
        if c.is_whitespace() {
            continue;
        }
        match symbol(c) {
            Some(upper) => symbols.push(upper),
            None => {
                return Err(OtpError::InvalidSecret(format!(
                    "invalid Base32 character at position {position}"
                )))
            }
        }
    }

    // Drop trailing symbols that only carry partial-byte bits.
    let whole = encoded_len(decoded_len(symbols.len()));
    symbols.truncate(whole);
    if symbols.is_empty() {
        return Ok(Vec::new());
    }

    permissive()?
        .decode(&symbols)
        .map_err(|e| {
            OtpError::InvalidSecret(format!(
                "malformed Base32 input at position {}",
                e.position
            ))
        })
}

/// Check that `encoded` only holds Base32 symbols, whitespace and trailing
/// padding, without allocating the decoded output.
///
/// Blank input is not valid.
#[must_use]
pub fn is_valid(encoded: &str) -> bool {
    let mut seen = false;
    for c in content(encoded).chars().filter(|c| !c.is_whitespace()) {
        if symbol(c).is_none() {
            return false;
        }
        seen = true;
    }
    seen
}

/// Number of unpadded characters needed to encode `input_bytes` bytes:
/// `ceil(input_bytes * 8 / 5)`.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub const fn encoded_len(input_bytes: usize) -> usize {
    // Split to keep `input_bytes * 8` from overflowing.
    (input_bytes / 5) * BLOCK_CHARS + ((input_bytes % 5) * 8).div_ceil(5)
}

/// Number of whole bytes carried by `encoded_chars` symbols:
/// `floor(encoded_chars * 5 / 8)`.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub const fn decoded_len(encoded_chars: usize) -> usize {
    (encoded_chars / BLOCK_CHARS) * 5 + ((encoded_chars % BLOCK_CHARS) * 5) / 8
}

/// Strip trailing padding (and whitespace around it) from `encoded`.
pub(crate) fn content(encoded: &str) -> &str {
    encoded.trim_end_matches(|c: char| c == '=' || c.is_whitespace())
}

/// Map a character to its uppercase alphabet symbol, or `None`.
const fn symbol(c: char) -> Option<u8> {
    match c {
        'A'..='Z' | '2'..='7' => Some(c as u8),
        'a'..='z' => Some(c.to_ascii_uppercase() as u8),
        _ => None,
    }
}

/// Unpadded decoder that accepts non-zero trailing bits.
fn permissive() -> Result<&'static Encoding, OtpError> {
    static ENCODING: OnceLock<Option<Encoding>> = OnceLock::new();
    ENCODING
        .get_or_init(|| {
            let mut spec = Specification::new();
            spec.symbols.push_str(ALPHABET);
            spec.check_trailing_bits = false;
            spec.encoding().ok()
        })
        .as_ref()
        .ok_or_else(|| OtpError::Internal("Base32 decoder specification rejected".to_owned()))
}

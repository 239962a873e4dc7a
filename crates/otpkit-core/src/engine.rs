//! RFC 6238 TOTP and RFC 4226 HOTP code engine.
//!
//! Pure functions over explicit inputs: a secret, a counter or clock, and a
//! [`TotpConfig`]. The engine holds no state.

use std::time::SystemTime;

use crate::base32;
use crate::clock::{counter_for, Clock};
use crate::config::TotpConfig;
use crate::hmac;
use crate::OtpError;

/// Minimum decoded secret length in bytes (128 bits).
pub const MIN_SECRET_BYTES: usize = 16;

/// Minimum Base32 secret length in characters (26 × 5 = 130 bits).
pub const MIN_SECRET_CHARS: usize = 26;

/// Constant-time byte comparison for OTP codes.
///
/// Returns `true` iff both slices have equal length and identical contents.
/// Uses bitwise OR accumulation to avoid short-circuit timing leaks.
///
/// Note: The early return on length mismatch is acceptable for OTP codes
/// because the expected digit count is public configuration. The
/// constant-time property protects the *code value*, not its length.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}

// ── Generation (RFC 4226) ───────────────────────────────────────────

/// Generate the code for `counter`.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` if the secret is shorter than
/// [`MIN_SECRET_BYTES`].
#[must_use = "OTP code should be used or stored"]
pub fn generate(secret: &[u8], counter: u64, config: &TotpConfig) -> Result<String, OtpError> {
    validate_secret(secret)?;

    // HMAC(K, C) where C is counter as 8-byte big-endian (RFC 4226 §5.2).
    let counter_bytes = counter.to_be_bytes();
    let digest = hmac::compute(config.algorithm(), secret, &counter_bytes)?;
    let hmac_result = digest.as_ref();

    // Dynamic Truncation (RFC 4226 §5.3).
    // offset = low-order 4 bits of last byte; offset + 3 <= 18 < digest len.
    let last = hmac_result
        .last()
        .ok_or_else(|| OtpError::Hmac("empty digest".to_owned()))?;
    let offset = usize::from(last & 0x0F);
    let window = hmac_result
        .get(offset..offset.wrapping_add(4))
        .ok_or_else(|| OtpError::Hmac("digest too short for truncation".to_owned()))?;

    // Extract 4 bytes starting at offset, mask high bit (0x7FFFFFFF).
    let binary_code = u32::from_be_bytes([window[0] & 0x7F, window[1], window[2], window[3]]);

    // code = binary_code mod 10^digits. Modulus is never zero.
    #[allow(clippy::arithmetic_side_effects)]
    let code = binary_code % config.modulus();
    let width = usize::from(config.digits());

    Ok(format!("{code:0>width$}"))
}

/// Generate the code for the time step containing `instant`.
///
/// # Errors
///
/// Same as [`generate`].
#[must_use = "OTP code should be used or stored"]
pub fn generate_at(
    secret: &[u8],
    instant: SystemTime,
    config: &TotpConfig,
) -> Result<String, OtpError> {
    generate(secret, counter_for(instant, config.period_secs()), config)
}

/// Generate the code for the clock's current time step.
///
/// # Errors
///
/// Same as [`generate`].
#[must_use = "OTP code should be used or stored"]
pub fn generate_now(
    secret: &[u8],
    config: &TotpConfig,
    clock: &dyn Clock,
) -> Result<String, OtpError> {
    generate(secret, clock.counter(config.period_secs()), config)
}

// ── Verification (RFC 6238 §5.2) ────────────────────────────────────

/// Check `candidate` against every step in the drift window.
///
/// Malformed candidates are rejected with `Ok(false)` before any hashing.
/// Otherwise every offset in `-drift..=drift` is evaluated, even after a
/// match, so timing does not reveal which offset matched.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` if the secret is too short.
#[must_use = "validation result should be checked"]
pub fn verify(
    secret: &[u8],
    candidate: &str,
    config: &TotpConfig,
    clock: &dyn Clock,
) -> Result<bool, OtpError> {
    verify_with_offset(secret, candidate, config, clock).map(|offset| offset.is_some())
}

/// Like [`verify`], but reports which offset matched.
///
/// Offsets are evaluated in ascending order and the **last** match wins: if
/// two offsets in the window produce the same code, the larger offset is
/// returned. Offsets whose counter would leave the `u64` range are skipped.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` if the secret is too short.
#[must_use = "validation result should be checked"]
pub fn verify_with_offset(
    secret: &[u8],
    candidate: &str,
    config: &TotpConfig,
    clock: &dyn Clock,
) -> Result<Option<i64>, OtpError> {
    validate_secret(secret)?;
    if !is_valid_code_format(candidate, config.digits()) {
        return Ok(None);
    }

    let current = clock.counter(config.period_secs());
    let drift = i64::from(config.allowed_drift());

    let mut matched = None;
    for offset in -drift..=drift {
        let Some(counter) = current.checked_add_signed(offset) else {
            continue;
        };
        let expected = generate(secret, counter, config)?;
        // Constant-time comparison to prevent timing attacks.
        if constant_time_eq(expected.as_bytes(), candidate.as_bytes()) {
            matched = Some(offset);
        }
    }
    Ok(matched)
}

// ── Input validation ────────────────────────────────────────────────

/// Reject secrets shorter than [`MIN_SECRET_BYTES`].
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` stating the required and actual length.
pub fn validate_secret(secret: &[u8]) -> Result<(), OtpError> {
    if secret.len() < MIN_SECRET_BYTES {
        return Err(OtpError::InvalidSecret(format!(
            "secret must be at least {MIN_SECRET_BYTES} bytes, got {}",
            secret.len()
        )));
    }
    Ok(())
}

/// Validate a Base32 secret before decoding it.
///
/// Whitespace and trailing padding are ignored for the length check.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` if the text is blank, shorter than
/// [`MIN_SECRET_CHARS`] symbols, or contains characters outside the
/// Base32 alphabet.
pub fn validate_encoded_secret(encoded: &str) -> Result<(), OtpError> {
    if encoded.trim().is_empty() {
        return Err(OtpError::InvalidSecret(
            "secret must not be empty".to_owned(),
        ));
    }
    let symbols = base32::content(encoded)
        .chars()
        .filter(|c| !c.is_whitespace())
        .count();
    if symbols < MIN_SECRET_CHARS {
        return Err(OtpError::InvalidSecret(format!(
            "secret must be at least {MIN_SECRET_CHARS} Base32 characters, got {symbols}"
        )));
    }
    if !base32::is_valid(encoded) {
        return Err(OtpError::InvalidSecret(
            "secret contains invalid Base32 characters".to_owned(),
        ));
    }
    Ok(())
}

/// `true` iff `code` is exactly `digits` ASCII decimal characters.
#[must_use]
pub fn is_valid_code_format(code: &str, digits: u8) -> bool {
    code.len() == usize::from(digits) && code.bytes().all(|b| b.is_ascii_digit())
}

// ── Tests ───────────────────────────────────────────────────────────

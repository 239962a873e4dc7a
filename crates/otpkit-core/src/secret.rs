//! Shared-secret generation.
//!
//! The random source is passed in by the caller (`OsRng` in production, a
//! seeded generator in tests); nothing here keeps per-thread RNG state.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::algorithm::Algorithm;
use crate::base32;
use crate::engine::MIN_SECRET_BYTES;
use crate::memory::SecretHandle;
use crate::OtpError;

/// Default secret size in bytes (160 bits, RFC 4226 §4 recommendation).
pub const DEFAULT_SECRET_BYTES: usize = 20;

/// Fill a new [`SecretHandle`] with `len` random bytes.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` if `len` is below
/// [`MIN_SECRET_BYTES`], or `OtpError::Internal` if the RNG fails.
pub fn generate_secret_bytes<R>(rng: &mut R, len: usize) -> Result<SecretHandle, OtpError>
where
    R: RngCore + CryptoRng,
{
    if len < MIN_SECRET_BYTES {
        return Err(OtpError::InvalidSecret(format!(
            "secret length must be at least {MIN_SECRET_BYTES} bytes, got {len}"
        )));
    }
    let mut bytes = vec![0u8; len];
    if let Err(e) = rng.try_fill_bytes(&mut bytes) {
        return Err(OtpError::Internal(format!("CSPRNG fill failed: {e}")));
    }
    Ok(SecretHandle::wrap(bytes))
}

/// Generate a Base32 secret of `len` random bytes.
///
/// The raw bytes are zeroed once encoded.
///
/// # Errors
///
/// Same as [`generate_secret_bytes`].
pub fn generate_secret<R>(rng: &mut R, len: usize) -> Result<String, OtpError>
where
    R: RngCore + CryptoRng,
{
    generate_secret_bytes(rng, len)?.use_once(|bytes| Ok(base32::encode(bytes)))
}

/// Generate a Base32 secret sized for `algorithm` (20, 32 or 64 bytes).
///
/// # Errors
///
/// Returns `OtpError::Internal` if the RNG fails.
pub fn generate_secret_for<R>(rng: &mut R, algorithm: Algorithm) -> Result<String, OtpError>
where
    R: RngCore + CryptoRng,
{
    generate_secret(rng, algorithm.recommended_key_bytes())
}

/// Generate a [`DEFAULT_SECRET_BYTES`]-byte Base32 secret.
///
/// # Errors
///
/// Returns `OtpError::Internal` if the RNG fails.
pub fn generate_default_secret<R>(rng: &mut R) -> Result<String, OtpError>
where
    R: RngCore + CryptoRng,
{
    generate_secret(rng, DEFAULT_SECRET_BYTES)
}

/// `true` if `encoded` is valid Base32 carrying at least
/// [`MIN_SECRET_CHARS`](crate::engine::MIN_SECRET_CHARS) symbols.
#[must_use]
pub fn is_valid_secret(encoded: &str) -> bool {
    crate::engine::validate_encoded_secret(encoded).is_ok()
}

/// Entropy carried by `base32_len` Base32 symbols (5 bits each).
#[must_use]
pub const fn entropy_bits(base32_len: usize) -> usize {
    base32_len.saturating_mul(5)
}

/// Recommended Base32 length for `algorithm`.
#[must_use]
pub const fn recommended_len(algorithm: Algorithm) -> usize {
    algorithm.recommended_secret_len()
}

/// Decode a Base32 secret straight into a [`SecretHandle`].
///
/// The intermediate decode buffer is zeroed.
///
/// # Errors
///
/// Returns `OtpError::InvalidSecret` for text outside the Base32 alphabet.
pub fn decode_secret(encoded: &str) -> Result<SecretHandle, OtpError> {
    let decoded = Zeroizing::new(base32::decode(encoded)?);
    Ok(SecretHandle::copy_of(&decoded))
}

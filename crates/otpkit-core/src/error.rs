//! Error types for `otpkit-core`.

use thiserror::Error;

/// Errors produced by one-time code operations.
///
/// Messages describe *why* input was rejected (length, position, range).
/// They never carry secret bytes, decoded key material or candidate codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// Secret is absent, too short, or not valid Base32.
    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    /// Candidate code has the wrong length or contains non-digits.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// Out-of-range digits/period/drift, unknown algorithm, or an
    /// unavailable hashing primitive.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The keyed-hash computation failed for a reason other than
    /// availability.
    #[error("HMAC computation failed: {0}")]
    Hmac(String),

    /// Unexpected failure not attributable to caller input.
    #[error("internal error: {0}")]
    Internal(String),

    /// A [`SecretHandle`](crate::memory::SecretHandle) was read after release.
    #[error("secret handle has already been released")]
    Released,
}

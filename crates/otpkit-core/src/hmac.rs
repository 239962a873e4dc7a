//! Keyed-hash provider.
//!
//! Thin, stateless wrapper over `ring::hmac`. It validates its inputs and
//! forwards them; it never implements a hash primitive itself.

use std::fmt;

use ring::hmac;

use crate::algorithm::Algorithm;
use crate::OtpError;

/// HMAC output for one `compute` call.
///
/// `Debug` prints only the length.
pub struct Digest(hmac::Tag);

impl Digest {
    /// Digest length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.as_ref().len()
    }

    /// Always `false`: every supported algorithm yields at least 20 bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.as_ref().is_empty()
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({} bytes)", self.len())
    }
}

impl Algorithm {
    /// Map to the corresponding `ring::hmac::Algorithm`.
    fn to_ring_algorithm(self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => hmac::HMAC_SHA256,
            Self::Sha512 => hmac::HMAC_SHA512,
        }
    }
}

/// Compute `HMAC(key, message)` with the selected algorithm.
///
/// # Errors
///
/// - `OtpError::InvalidSecret` if `key` is empty.
/// - `OtpError::InvalidConfig` if `message` is empty.
///
/// Both checks run before any hashing.
pub fn compute(algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Digest, OtpError> {
    if key.is_empty() {
        return Err(OtpError::InvalidSecret("key must not be empty".to_owned()));
    }
    if message.is_empty() {
        return Err(OtpError::InvalidConfig(
            "HMAC message must not be empty".to_owned(),
        ));
    }

    let key = hmac::Key::new(algorithm.to_ring_algorithm(), key);
    let tag = hmac::sign(&key, message);

    if tag.as_ref().len() != algorithm.digest_len() {
        return Err(OtpError::Hmac(format!(
            "{} produced {} bytes, expected {}",
            algorithm.primitive_name(),
            tag.as_ref().len(),
            algorithm.digest_len()
        )));
    }
    Ok(Digest(tag))
}

/// Whether the primitive behind `algorithm` is usable in this build.
///
/// All three algorithms are compiled into `ring`, so this is always `true`;
/// it exists so callers can probe before building a configuration.
#[must_use]
pub const fn is_available(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::Sha1 | Algorithm::Sha256 | Algorithm::Sha512
    )
}

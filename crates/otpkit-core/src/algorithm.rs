//! HMAC algorithm selection and per-algorithm metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::OtpError;

/// HMAC algorithm used for code generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// HMAC-SHA1 (default for most authenticator apps).
    #[default]
    Sha1,
    /// HMAC-SHA256.
    Sha256,
    /// HMAC-SHA512.
    Sha512,
}

/// Static metadata for one [`Algorithm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlgorithmInfo {
    /// Primitive name as platform crypto libraries spell it.
    pub primitive_name: &'static str,
    /// Name used in `otpauth://` URIs (`algorithm=` parameter).
    pub otpauth_name: &'static str,
    /// Key size recommended by RFC 6238 Appendix A, in bytes.
    pub recommended_key_bytes: usize,
    /// HMAC output length, in bytes.
    pub digest_len: usize,
}

const SHA1_INFO: AlgorithmInfo = AlgorithmInfo {
    primitive_name: "HmacSHA1",
    otpauth_name: "SHA1",
    recommended_key_bytes: 20,
    digest_len: 20,
};

const SHA256_INFO: AlgorithmInfo = AlgorithmInfo {
    primitive_name: "HmacSHA256",
    otpauth_name: "SHA256",
    recommended_key_bytes: 32,
    digest_len: 32,
};

const SHA512_INFO: AlgorithmInfo = AlgorithmInfo {
    primitive_name: "HmacSHA512",
    otpauth_name: "SHA512",
    recommended_key_bytes: 64,
    digest_len: 64,
};

const ALGORITHMS: [(Algorithm, &AlgorithmInfo); 3] = [
    (Algorithm::Sha1, &SHA1_INFO),
    (Algorithm::Sha256, &SHA256_INFO),
    (Algorithm::Sha512, &SHA512_INFO),
];

impl Algorithm {
    /// All supported algorithms, in table order.
    pub const ALL: [Self; 3] = [Self::Sha1, Self::Sha256, Self::Sha512];

    /// Look up the metadata row for this algorithm.
    #[must_use]
    pub const fn info(self) -> &'static AlgorithmInfo {
        match self {
            Self::Sha1 => &SHA1_INFO,
            Self::Sha256 => &SHA256_INFO,
            Self::Sha512 => &SHA512_INFO,
        }
    }

    /// Primitive name (`HmacSHA1`, `HmacSHA256`, `HmacSHA512`).
    #[must_use]
    pub const fn primitive_name(self) -> &'static str {
        self.info().primitive_name
    }

    /// Name used in `otpauth://` URIs.
    #[must_use]
    pub const fn otpauth_name(self) -> &'static str {
        self.info().otpauth_name
    }

    /// Recommended secret size in bytes.
    #[must_use]
    pub const fn recommended_key_bytes(self) -> usize {
        self.info().recommended_key_bytes
    }

    /// Number of Base32 characters needed to carry
    /// [`recommended_key_bytes`](Self::recommended_key_bytes).
    #[must_use]
    pub const fn recommended_secret_len(self) -> usize {
        crate::base32::encoded_len(self.recommended_key_bytes())
    }

    /// HMAC digest length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        self.info().digest_len
    }
}

impl FromStr for Algorithm {
    type Err = OtpError;

    /// Accepts `SHA1`, `sha-256`, `HmacSHA512` and similar spellings.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(OtpError::InvalidConfig(
                "algorithm name must not be empty".to_owned(),
            ));
        }
        let normalized = trimmed.to_ascii_uppercase().replace("HMAC", "").replace('-', "");
        ALGORITHMS
            .iter()
            .find(|(_, info)| {
                info.otpauth_name == normalized || info.primitive_name.eq_ignore_ascii_case(trimmed)
            })
            .map(|(algorithm, _)| *algorithm)
            .ok_or_else(|| {
                OtpError::InvalidConfig(format!(
                    "unknown algorithm {trimmed:?}, supported: SHA1, SHA256, SHA512"
                ))
            })
    }
}

impl TryFrom<String> for Algorithm {
    type Error = OtpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.otpauth_name().to_owned()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.otpauth_name())
    }
}

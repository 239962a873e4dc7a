//! Validated, immutable TOTP configuration.
//!
//! A [`TotpConfig`] is built once (via [`TotpConfig::builder`], a preset, or
//! JSON) and shared read-only by every operation that uses it. Every
//! construction path runs the same range checks.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::OtpError;

// ── Constants ───────────────────────────────────────────────────────

/// Shortest supported code.
pub const MIN_DIGITS: u8 = 6;

/// Longest supported code.
pub const MAX_DIGITS: u8 = 8;

/// Shortest supported time step, in seconds.
pub const MIN_PERIOD_SECS: u32 = 15;

/// Longest supported time step, in seconds.
pub const MAX_PERIOD_SECS: u32 = 120;

/// Largest supported drift window (steps on each side of the current one).
pub const MAX_DRIFT_STEPS: u8 = 5;

/// Default code length.
pub const DEFAULT_DIGITS: u8 = 6;

/// Default TOTP period in seconds (RFC 6238 §4).
pub const DEFAULT_PERIOD_SECS: u32 = 30;

/// Default drift window (±1 step per RFC 6238 §5.2).
pub const DEFAULT_DRIFT: u8 = 1;

// ── Config ──────────────────────────────────────────────────────────

/// TOTP parameters: algorithm, digits, period and allowed drift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTotpConfig", into = "RawTotpConfig")]
pub struct TotpConfig {
    algorithm: Algorithm,
    digits: u8,
    period_secs: u32,
    allowed_drift: u8,
}

impl TotpConfig {
    /// Start from the defaults (SHA1, 6 digits, 30 s, drift 1).
    #[must_use]
    pub fn builder() -> TotpConfigBuilder {
        TotpConfigBuilder::default()
    }

    /// Builder seeded with this configuration's values.
    #[must_use]
    pub fn to_builder(&self) -> TotpConfigBuilder {
        TotpConfigBuilder {
            algorithm: self.algorithm,
            digits: self.digits,
            period_secs: u64::from(self.period_secs),
            allowed_drift: self.allowed_drift,
        }
    }

    /// SHA256 with the remaining defaults.
    #[must_use]
    pub const fn sha256() -> Self {
        Self {
            algorithm: Algorithm::Sha256,
            ..DEFAULT_CONFIG
        }
    }

    /// SHA512 with 8-digit codes.
    #[must_use]
    pub const fn high_security() -> Self {
        Self {
            algorithm: Algorithm::Sha512,
            digits: 8,
            ..DEFAULT_CONFIG
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidConfig` for malformed JSON or out-of-range
    /// values.
    pub fn from_json(json: &str) -> Result<Self, OtpError> {
        serde_json::from_str(json).map_err(|e| OtpError::InvalidConfig(e.to_string()))
    }

    /// HMAC algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Code length in digits.
    #[must_use]
    pub const fn digits(&self) -> u8 {
        self.digits
    }

    /// Time step in seconds.
    #[must_use]
    pub const fn period_secs(&self) -> u32 {
        self.period_secs
    }

    /// Time step as a [`Duration`].
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs as u64)
    }

    /// Steps accepted on each side of the current one.
    #[must_use]
    pub const fn allowed_drift(&self) -> u8 {
        self.allowed_drift
    }

    /// `10^digits`, the truncation modulus.
    #[must_use]
    pub(crate) const fn modulus(&self) -> u32 {
        match self.digits {
            6 => 1_000_000,
            7 => 10_000_000,
            _ => 100_000_000,
        }
    }
}

const DEFAULT_CONFIG: TotpConfig = TotpConfig {
    algorithm: Algorithm::Sha1,
    digits: DEFAULT_DIGITS,
    period_secs: DEFAULT_PERIOD_SECS,
    allowed_drift: DEFAULT_DRIFT,
};

impl Default for TotpConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

impl fmt::Display for TotpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TotpConfig[algorithm={}, digits={}, period={}s, drift={}]",
            self.algorithm, self.digits, self.period_secs, self.allowed_drift
        )
    }
}

// ── Builder ─────────────────────────────────────────────────────────

/// Collects TOTP parameters; [`build`](Self::build) validates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TotpConfigBuilder {
    algorithm: Algorithm,
    digits: u8,
    period_secs: u64,
    allowed_drift: u8,
}

impl Default for TotpConfigBuilder {
    fn default() -> Self {
        Self {
            algorithm: DEFAULT_CONFIG.algorithm,
            digits: DEFAULT_CONFIG.digits,
            period_secs: u64::from(DEFAULT_CONFIG.period_secs),
            allowed_drift: DEFAULT_CONFIG.allowed_drift,
        }
    }
}

impl TotpConfigBuilder {
    /// HMAC algorithm.
    #[must_use]
    pub const fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Code length, 6–8.
    #[must_use]
    pub const fn digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    /// Time step in whole seconds, 15–120.
    #[must_use]
    pub const fn period_secs(mut self, secs: u64) -> Self {
        self.period_secs = secs;
        self
    }

    /// Time step as a [`Duration`]; sub-second parts are ignored.
    #[must_use]
    pub const fn period(mut self, period: Duration) -> Self {
        self.period_secs = period.as_secs();
        self
    }

    /// Steps accepted on each side of the current one, 0–5.
    #[must_use]
    pub const fn allowed_drift(mut self, steps: u8) -> Self {
        self.allowed_drift = steps;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidConfig` naming the allowed range of the
    /// first out-of-range field.
    pub fn build(self) -> Result<TotpConfig, OtpError> {
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            return Err(OtpError::InvalidConfig(format!(
                "digits must be between {MIN_DIGITS} and {MAX_DIGITS}, got {}",
                self.digits
            )));
        }
        let period_secs = u32::try_from(self.period_secs)
            .ok()
            .filter(|secs| (MIN_PERIOD_SECS..=MAX_PERIOD_SECS).contains(secs))
            .ok_or_else(|| {
                OtpError::InvalidConfig(format!(
                    "period must be between {MIN_PERIOD_SECS} and {MAX_PERIOD_SECS} seconds, got {}",
                    self.period_secs
                ))
            })?;
        if self.allowed_drift > MAX_DRIFT_STEPS {
            return Err(OtpError::InvalidConfig(format!(
                "allowed drift must be between 0 and {MAX_DRIFT_STEPS}, got {}",
                self.allowed_drift
            )));
        }
        if !crate::hmac::is_available(self.algorithm) {
            return Err(OtpError::InvalidConfig(format!(
                "HMAC algorithm not available: {}",
                self.algorithm.primitive_name()
            )));
        }
        Ok(TotpConfig {
            algorithm: self.algorithm,
            digits: self.digits,
            period_secs,
            allowed_drift: self.allowed_drift,
        })
    }
}

// ── Serde representation ────────────────────────────────────────────

/// Wire form of [`TotpConfig`]; validated on the way in.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTotpConfig {
    #[serde(default)]
    algorithm: Algorithm,
    #[serde(default = "default_digits")]
    digits: u8,
    #[serde(default = "default_period")]
    period_secs: u64,
    #[serde(default = "default_drift")]
    allowed_drift: u8,
}

const fn default_digits() -> u8 {
    DEFAULT_DIGITS
}
const fn default_period() -> u64 {
    DEFAULT_PERIOD_SECS as u64
}
const fn default_drift() -> u8 {
    DEFAULT_DRIFT
}

impl TryFrom<RawTotpConfig> for TotpConfig {
    type Error = OtpError;

    fn try_from(raw: RawTotpConfig) -> Result<Self, Self::Error> {
        TotpConfig::builder()
            .algorithm(raw.algorithm)
            .digits(raw.digits)
            .period_secs(raw.period_secs)
            .allowed_drift(raw.allowed_drift)
            .build()
    }
}

impl From<TotpConfig> for RawTotpConfig {
    fn from(config: TotpConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            digits: config.digits,
            period_secs: u64::from(config.period_secs),
            allowed_drift: config.allowed_drift,
        }
    }
}

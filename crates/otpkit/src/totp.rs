//! High-level TOTP service: validation, secret handling, drift-window
//! verification and optional replay protection behind one type.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use otpkit_core::{
    engine, is_valid_code_format, secret, validate_encoded_secret, Algorithm, Clock, SecretHandle,
    SystemClock, TotpConfig,
};

use crate::error::TotpError;
use crate::replay::{InMemoryReplayGuard, ReplayGuard};

// ── Verification outcome ────────────────────────────────────────────

/// Why a code was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// Wrong length or non-digit characters.
    MalformedCode,
    /// No step in the drift window produced this code.
    Mismatch,
    /// The code matched but has already been accepted.
    Replayed,
}

impl InvalidReason {
    /// Human-readable description.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedCode => "invalid code format",
            Self::Mismatch => "code does not match",
            Self::Replayed => "code has already been used",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Totp::verify_with_details`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verification {
    /// Accepted; `offset` is the matched step relative to the current one.
    Valid {
        /// Signed time-step offset, within `-drift..=drift`.
        offset: i64,
    },
    /// Rejected.
    Invalid(InvalidReason),
}

impl Verification {
    /// `true` for [`Verification::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Matched offset, if valid.
    #[must_use]
    pub const fn offset(&self) -> Option<i64> {
        match self {
            Self::Valid { offset } => Some(*offset),
            Self::Invalid(_) => None,
        }
    }

    /// Rejection reason, if invalid.
    #[must_use]
    pub const fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid { offset } => write!(f, "valid (offset {offset})"),
            Self::Invalid(reason) => write!(f, "invalid: {reason}"),
        }
    }
}

/// Replay key for a code: `identity:code`, or just `code` without an
/// identity.
#[must_use]
pub fn replay_key(identity: Option<&str>, code: &str) -> String {
    match identity {
        Some(identity) => format!("{identity}:{code}"),
        None => code.to_owned(),
    }
}

// ── Facade ──────────────────────────────────────────────────────────

/// TOTP generator and verifier.
///
/// Secrets arrive as Base32 text, are decoded into a [`SecretHandle`] for
/// the duration of one call and zeroed before the call returns, on every
/// path. Nothing here retains a secret.
///
/// `Totp` is `Send + Sync`; share it behind an `Arc`.
#[derive(Clone)]
pub struct Totp {
    config: TotpConfig,
    clock: Arc<dyn Clock>,
    replay_guard: Option<Arc<dyn ReplayGuard>>,
}

impl Default for Totp {
    fn default() -> Self {
        Self {
            config: TotpConfig::default(),
            clock: Arc::new(SystemClock),
            replay_guard: None,
        }
    }
}

impl fmt::Debug for Totp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Totp")
            .field("config", &self.config)
            .field("replay_protection", &self.replay_guard.is_some())
            .finish_non_exhaustive()
    }
}

impl Totp {
    /// Start configuring a [`Totp`].
    #[must_use]
    pub fn builder() -> TotpBuilder {
        TotpBuilder::default()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TotpConfig {
        &self.config
    }

    /// Injected clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Replay guard, if protection is enabled.
    #[must_use]
    pub fn replay_guard(&self) -> Option<&dyn ReplayGuard> {
        self.replay_guard.as_deref()
    }

    /// Time-step counter for the clock's current instant.
    #[must_use]
    pub fn current_counter(&self) -> u64 {
        self.clock.counter(self.config.period_secs())
    }

    /// Seconds until the current code expires.
    #[must_use]
    pub fn seconds_remaining(&self) -> u32 {
        self.clock.seconds_remaining(self.config.period_secs())
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Code for the current time step.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Otp` with `InvalidSecret` for a blank, short or
    /// non-Base32 secret.
    pub fn generate(&self, secret: &str) -> Result<String, TotpError> {
        self.generate_for_counter(secret, self.current_counter())
    }

    /// Code for the time step containing `instant`.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub fn generate_at(&self, secret: &str, instant: SystemTime) -> Result<String, TotpError> {
        let handle = open_secret(secret)?;
        handle.use_once(|key| Ok(engine::generate_at(key, instant, &self.config)?))
    }

    /// Code for an explicit counter (HOTP semantics).
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub fn generate_for_counter(&self, secret: &str, counter: u64) -> Result<String, TotpError> {
        let handle = open_secret(secret)?;
        handle.use_once(|key| Ok(engine::generate(key, counter, &self.config)?))
    }

    // ── Verification ────────────────────────────────────────────────

    /// Verify `code` against the drift window around the current step.
    ///
    /// A malformed code is `Ok(false)`. With replay protection, a matching
    /// code is accepted only the first time.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Otp` for an invalid secret and
    /// `TotpError::GuardClosed` if the replay guard has shut down.
    pub fn verify(&self, secret: &str, code: &str) -> Result<bool, TotpError> {
        self.verify_with_identity(secret, code, None)
    }

    /// Like [`verify`](Self::verify), scoping replay protection to
    /// `identity` so two users may submit the same code.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_with_identity(
        &self,
        secret: &str,
        code: &str,
        identity: Option<&str>,
    ) -> Result<bool, TotpError> {
        self.verify_with_details(secret, code, identity)
            .map(|outcome| outcome.is_valid())
    }

    /// Verify and report the matched offset or the rejection reason.
    ///
    /// The replay guard is consulted exactly as in
    /// [`verify`](Self::verify): a successful call consumes the code.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_with_details(
        &self,
        secret: &str,
        code: &str,
        identity: Option<&str>,
    ) -> Result<Verification, TotpError> {
        validate_encoded_secret(secret)?;
        if !is_valid_code_format(code, self.config.digits()) {
            tracing::debug!("TOTP verification rejected: malformed code");
            return Ok(Verification::Invalid(InvalidReason::MalformedCode));
        }

        let handle = secret::decode_secret(secret)?;
        let matched = handle.use_once(|key| {
            engine::verify_with_offset(key, code, &self.config, self.clock.as_ref())
        })?;
        let Some(offset) = matched else {
            tracing::debug!("TOTP verification rejected: no match in drift window");
            return Ok(Verification::Invalid(InvalidReason::Mismatch));
        };

        if let Some(guard) = &self.replay_guard {
            if !guard.mark_used(&replay_key(identity, code))? {
                tracing::warn!(offset, "TOTP code replay rejected");
                return Ok(Verification::Invalid(InvalidReason::Replayed));
            }
        }

        tracing::debug!(offset, "TOTP verification accepted");
        Ok(Verification::Valid { offset })
    }
}

/// Validate the Base32 text, then decode it into a handle.
fn open_secret(encoded: &str) -> Result<SecretHandle, TotpError> {
    validate_encoded_secret(encoded)?;
    Ok(secret::decode_secret(encoded)?)
}

// ── Builder ─────────────────────────────────────────────────────────

enum ReplaySetting {
    Disabled,
    Guard(Arc<dyn ReplayGuard>),
    FromConfig,
    Retention(Duration),
}

/// Builder for [`Totp`].
pub struct TotpBuilder {
    config: TotpConfig,
    algorithm: Option<Algorithm>,
    clock: Arc<dyn Clock>,
    replay: ReplaySetting,
}

impl Default for TotpBuilder {
    fn default() -> Self {
        Self {
            config: TotpConfig::default(),
            algorithm: None,
            clock: Arc::new(SystemClock),
            replay: ReplaySetting::Disabled,
        }
    }
}

impl TotpBuilder {
    /// Use `config` (default: SHA1, 6 digits, 30 s, drift 1).
    #[must_use]
    pub const fn config(mut self, config: TotpConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the configuration's algorithm.
    #[must_use]
    pub const fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Inject a clock (default: [`SystemClock`]).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a caller-supplied replay guard, e.g. one backed by a shared
    /// store.
    #[must_use]
    pub fn replay_guard(mut self, guard: Arc<dyn ReplayGuard>) -> Self {
        self.replay = ReplaySetting::Guard(guard);
        self
    }

    /// Enable an in-memory guard whose retention covers the drift window.
    #[must_use]
    pub fn with_replay_protection(mut self) -> Self {
        self.replay = ReplaySetting::FromConfig;
        self
    }

    /// Enable an in-memory guard with an explicit retention.
    #[must_use]
    pub fn with_replay_protection_for(mut self, retention: Duration) -> Self {
        self.replay = ReplaySetting::Retention(retention);
        self
    }

    /// Assemble the [`Totp`].
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Otp` if the algorithm override yields an invalid
    /// configuration, `TotpError::InvalidRetention` for a zero retention
    /// and `TotpError::Io` if a guard's sweep thread cannot start.
    pub fn build(self) -> Result<Totp, TotpError> {
        let config = match self.algorithm {
            Some(algorithm) => self.config.to_builder().algorithm(algorithm).build()?,
            None => self.config,
        };
        let replay_guard: Option<Arc<dyn ReplayGuard>> = match self.replay {
            ReplaySetting::Disabled => None,
            ReplaySetting::Guard(guard) => Some(guard),
            ReplaySetting::FromConfig => Some(Arc::new(InMemoryReplayGuard::for_config(&config)?)),
            ReplaySetting::Retention(retention) => {
                Some(Arc::new(InMemoryReplayGuard::new(retention)?))
            }
        };
        tracing::debug!(
            %config,
            replay_protection = replay_guard.is_some(),
            "TOTP service configured"
        );
        Ok(Totp {
            config,
            clock: self.clock,
            replay_guard,
        })
    }
}

impl fmt::Debug for TotpBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TotpBuilder")
            .field("config", &self.config)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

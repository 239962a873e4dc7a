//! `otpkit` — TOTP service layer over `otpkit-core`.
//!
//! Adds the [`Totp`] facade (secret lifecycle, drift-window verification)
//! and replay protection via [`ReplayGuard`]. Logging goes through
//! `tracing`; install a subscriber in the host application to see it.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod replay;
pub mod totp;

pub use error::TotpError;
pub use replay::{
    retention_for, InMemoryReplayGuard, InMemoryReplayGuardBuilder, ReplayGuard,
    DEFAULT_RETENTION, MIN_SWEEP_INTERVAL, RETENTION_MARGIN,
};
pub use totp::{replay_key, InvalidReason, Totp, TotpBuilder, Verification};

pub use otpkit_core::{
    generate_default_secret, generate_secret, generate_secret_for, is_valid_secret, Algorithm,
    Clock, FixedClock, OtpError, SecretHandle, SystemClock, TotpConfig, TotpConfigBuilder,
};

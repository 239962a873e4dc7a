//! `otpkit-core` — RFC 6238 / RFC 4226 one-time code primitives.
//!
//! This crate is the audit target: no threads, no I/O, no global mutable
//! state. Every operation is a function of its explicit arguments (plus a
//! read of the injected [`Clock`]).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod algorithm;
pub mod base32;
pub mod hmac;

pub mod clock;
pub mod config;

pub mod engine;

pub mod secret;

pub use algorithm::{Algorithm, AlgorithmInfo};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    TotpConfig, TotpConfigBuilder, DEFAULT_DIGITS, DEFAULT_DRIFT, DEFAULT_PERIOD_SECS,
    MAX_DIGITS, MAX_DRIFT_STEPS, MAX_PERIOD_SECS, MIN_DIGITS, MIN_PERIOD_SECS,
};
pub use engine::{
    constant_time_eq, generate, generate_at, generate_now, is_valid_code_format, validate_encoded_secret,
    validate_secret, verify, verify_with_offset, MIN_SECRET_BYTES, MIN_SECRET_CHARS,
};
pub use error::OtpError;
pub use memory::SecretHandle;
pub use secret::{
    decode_secret, generate_default_secret, generate_secret, generate_secret_bytes,
    generate_secret_for, is_valid_secret, DEFAULT_SECRET_BYTES,
};

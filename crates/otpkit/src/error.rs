//! Error types for `otpkit`.

use otpkit_core::OtpError;
use thiserror::Error;

/// Errors produced by the facade and the replay guard.
#[derive(Debug, Error)]
pub enum TotpError {
    /// Input validation or code computation failed (delegated from core).
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// The replay guard was closed; it no longer accepts new marks.
    #[error("replay guard has been closed")]
    GuardClosed,

    /// Replay retention or sweep interval is zero.
    #[error("invalid replay retention: {0}")]
    InvalidRetention(String),

    /// The background sweep thread could not be spawned.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

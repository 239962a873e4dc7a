//! Time sources and time-step arithmetic (RFC 6238 §4).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current instant.
///
/// Implementations must be side-effect free; reading the clock never
/// blocks.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> SystemTime;

    /// Whole seconds since the Unix epoch.
    fn epoch_seconds(&self) -> u64 {
        epoch_seconds(self.now())
    }

    /// Time-step counter for the current instant.
    fn counter(&self, period_secs: u32) -> u64 {
        counter_for(self.now(), period_secs)
    }

    /// Seconds until the current time step ends, in `1..=period_secs`.
    fn seconds_remaining(&self, period_secs: u32) -> u32 {
        seconds_remaining_at(self.now(), period_secs)
    }
}

/// Whole seconds between the Unix epoch and `instant`.
///
/// Instants before the epoch clamp to `0`.
#[must_use]
pub fn epoch_seconds(instant: SystemTime) -> u64 {
    instant
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// `T = floor(epoch_seconds / period)` per RFC 6238 §4.
///
/// A zero period yields counter `0`; validated configurations never carry
/// one.
#[must_use]
pub fn counter_for(instant: SystemTime, period_secs: u32) -> u64 {
    epoch_seconds(instant)
        .checked_div(u64::from(period_secs))
        .unwrap_or(0)
}

/// Seconds until the time step containing `instant` ends.
#[must_use]
pub fn seconds_remaining_at(instant: SystemTime, period_secs: u32) -> u32 {
    let period = u64::from(period_secs);
    let elapsed = epoch_seconds(instant).checked_rem(period).unwrap_or(0);
    // elapsed < period <= u32::MAX, so the difference fits.
    u32::try_from(period.saturating_sub(elapsed)).unwrap_or(period_secs)
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant, for deterministic tests and replays of
/// historical verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock {
    instant: SystemTime,
}

impl FixedClock {
    /// Freeze the clock at `instant`.
    #[must_use]
    pub const fn new(instant: SystemTime) -> Self {
        Self { instant }
    }

    /// Freeze the clock `secs` seconds after the Unix epoch.
    #[must_use]
    pub fn at_epoch_seconds(secs: u64) -> Self {
        Self::new(at_epoch(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.instant
    }
}

/// The instant `secs` seconds after the Unix epoch.
///
/// Falls back to the epoch itself if the platform cannot represent it.
#[must_use]
pub fn at_epoch(secs: u64) -> SystemTime {
    UNIX_EPOCH
        .checked_add(Duration::from_secs(secs))
        .unwrap_or(UNIX_EPOCH)
}

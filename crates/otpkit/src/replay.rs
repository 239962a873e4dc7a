//! Replay protection: remembers which codes have already been accepted.
//!
//! [`ReplayGuard`] is the capability the facade consults after a code
//! matches. [`InMemoryReplayGuard`] is the single-process implementation;
//! clustered deployments implement the trait over a shared store.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use otpkit_core::TotpConfig;

use crate::error::TotpError;

// ── Constants ───────────────────────────────────────────────────────

/// Retention used by [`InMemoryReplayGuard::with_default_retention`]: a
/// 30 s period with drift 1, plus margin.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(120);

/// Margin added on top of the drift window by
/// [`InMemoryReplayGuard::for_config`].
pub const RETENTION_MARGIN: Duration = Duration::from_secs(30);

/// Floor for the derived sweep interval.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Number of independently locked map shards.
const SHARD_COUNT: usize = 16;

const SWEEPER_THREAD_NAME: &str = "otpkit-replay-sweeper";

// ── Capability ──────────────────────────────────────────────────────

/// Tracks consumed codes so a valid code is accepted at most once.
///
/// Keys are opaque; the facade builds them as `identity:code` (or just
/// `code` without an identity).
pub trait ReplayGuard: Send + Sync {
    /// Record `key` as used.
    ///
    /// Returns `Ok(true)` iff this call is the first live marking of `key`;
    /// `Ok(false)` if it was already marked and is still within retention.
    ///
    /// # Errors
    ///
    /// Implementations may fail when they can no longer record marks (for
    /// example after shutdown).
    fn mark_used(&self, key: &str) -> Result<bool, TotpError>;

    /// Whether `key` is currently marked, without marking it.
    fn was_used(&self, key: &str) -> bool;

    /// Forget every mark. This resets replay protection.
    fn clear(&self);

    /// Number of live (unexpired) marks.
    fn size(&self) -> usize;
}

// ── In-memory implementation ────────────────────────────────────────

type Shard = Mutex<HashMap<String, Instant>>;

/// State shared between the guard and its sweep thread.
struct Shared {
    shards: Box<[Shard]>,
    hasher: RandomState,
    retention: Duration,
    closed: AtomicBool,
}

impl Shared {
    fn shard(&self, key: &str) -> MutexGuard<'_, HashMap<String, Instant>> {
        let hash = self.hasher.hash_one(key);
        // SHARD_COUNT is a non-zero constant.
        #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
        let index = (hash % SHARD_COUNT as u64) as usize;
        lock(&self.shards[index])
    }

    fn is_expired(&self, seen: Instant, now: Instant) -> bool {
        now.saturating_duration_since(seen) > self.retention
    }

    /// Drop expired entries one shard at a time. Returns the number removed.
    fn sweep(&self) -> usize {
        let mut removed = 0usize;
        for shard in self.shards.iter() {
            let now = Instant::now();
            let mut map = lock(shard);
            let before = map.len();
            map.retain(|_, seen| !self.is_expired(*seen, now));
            removed = removed.saturating_add(before.saturating_sub(map.len()));
        }
        removed
    }
}

/// Lock a shard, recovering from poisoning: every critical section leaves
/// the map consistent, so a panic elsewhere never corrupts it.
fn lock(shard: &Shard) -> MutexGuard<'_, HashMap<String, Instant>> {
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the background sweep thread.
struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Thread-safe, time-expiring replay guard for single-instance deployments.
///
/// Entries are kept in key-hashed shards, each behind its own mutex.
/// `mark_used` performs insert-if-absent, re-admitting a key whose previous
/// mark has outlived the retention window, inside one critical section, so
/// exactly one of any number of racing callers observes `true`.
///
/// A background thread sweeps expired entries every `retention / 2`
/// (at least [`MIN_SWEEP_INTERVAL`]), locking one shard at a time.
///
/// After [`close`](Self::close) (or drop) the sweep stops and
/// `mark_used` fails with [`TotpError::GuardClosed`]. `was_used`, `size`
/// and `clear` keep working on the entries that remain, which no longer
/// expire from the map but are still judged against retention.
pub struct InMemoryReplayGuard {
    shared: Arc<Shared>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<Sweeper>>,
}

impl InMemoryReplayGuard {
    /// Guard that remembers marks for `retention`.
    ///
    /// Retention should cover `period * (1 + 2 * drift)` so a code accepted
    /// at the edge of the drift window stays tracked until the window has
    /// passed; see [`for_config`](Self::for_config).
    ///
    /// # Errors
    ///
    /// Returns `TotpError::InvalidRetention` for a zero retention and
    /// `TotpError::Io` if the sweep thread cannot be spawned.
    pub fn new(retention: Duration) -> Result<Self, TotpError> {
        Self::builder(retention).build()
    }

    /// Guard with [`DEFAULT_RETENTION`] (two minutes).
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Io` if the sweep thread cannot be spawned.
    pub fn with_default_retention() -> Result<Self, TotpError> {
        Self::new(DEFAULT_RETENTION)
    }

    /// Guard whose retention covers the whole drift window of `config`
    /// plus [`RETENTION_MARGIN`].
    ///
    /// # Errors
    ///
    /// Returns `TotpError::Io` if the sweep thread cannot be spawned.
    pub fn for_config(config: &TotpConfig) -> Result<Self, TotpError> {
        Self::new(retention_for(config))
    }

    /// Start configuring a guard with the given retention.
    #[must_use]
    pub const fn builder(retention: Duration) -> InMemoryReplayGuardBuilder {
        InMemoryReplayGuardBuilder {
            retention,
            sweep_interval: None,
        }
    }

    /// Configured retention.
    #[must_use]
    pub fn retention(&self) -> Duration {
        self.shared.retention
    }

    /// Interval between background sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Remove expired entries now. Returns the number removed.
    ///
    /// The background thread calls this periodically; calling it directly
    /// is only needed after the guard has been closed.
    pub fn purge_expired(&self) -> usize {
        self.shared.sweep()
    }

    /// Stop the sweep thread and reject further marks. Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wait out marks that checked the flag before it was set.
        for shard in self.shared.shards.iter() {
            drop(lock(shard));
        }
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Sweeper { stop, handle }) = sweeper {
            // A send error only means the thread already exited.
            let _ = stop.send(());
            if handle.join().is_err() {
                tracing::warn!("replay guard sweep thread panicked");
            }
        }
        tracing::debug!("replay guard closed");
    }

    fn spawn_sweeper(shared: &Arc<Shared>, interval: Duration) -> Result<Sweeper, TotpError> {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let shared = Arc::clone(shared);
        let handle = thread::Builder::new()
            .name(SWEEPER_THREAD_NAME.to_owned())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = shared.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, "replay guard swept expired entries");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(Sweeper { stop, handle })
    }
}

impl ReplayGuard for InMemoryReplayGuard {
    fn mark_used(&self, key: &str) -> Result<bool, TotpError> {
        if self.is_closed() {
            return Err(TotpError::GuardClosed);
        }
        if key.is_empty() {
            return Ok(false);
        }

        let now = Instant::now();
        let mut map = self.shared.shard(key);
        // `close` passes through every shard lock after setting the flag, so
        // a mark that sees it clear here finishes before `close` returns.
        if self.is_closed() {
            return Err(TotpError::GuardClosed);
        }
        match map.get_mut(key) {
            None => {
                map.insert(key.to_owned(), now);
                Ok(true)
            }
            Some(seen) if self.shared.is_expired(*seen, now) => {
                *seen = now;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    fn was_used(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let now = Instant::now();
        self.shared
            .shard(key)
            .get(key)
            .is_some_and(|seen| !self.shared.is_expired(*seen, now))
    }

    fn clear(&self) {
        for shard in self.shared.shards.iter() {
            lock(shard).clear();
        }
    }

    fn size(&self) -> usize {
        let now = Instant::now();
        self.shared
            .shards
            .iter()
            .map(|shard| {
                lock(shard)
                    .values()
                    .filter(|seen| !self.shared.is_expired(**seen, now))
                    .count()
            })
            .sum()
    }
}

impl Drop for InMemoryReplayGuard {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for InMemoryReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReplayGuard")
            .field("retention", &self.shared.retention)
            .field("sweep_interval", &self.sweep_interval)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Builder for [`InMemoryReplayGuard`].
#[derive(Clone, Copy, Debug)]
pub struct InMemoryReplayGuardBuilder {
    retention: Duration,
    sweep_interval: Option<Duration>,
}

impl InMemoryReplayGuardBuilder {
    /// Override the sweep interval (default `max(retention / 2, 1 s)`).
    #[must_use]
    pub const fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Validate settings and start the sweep thread.
    ///
    /// # Errors
    ///
    /// Returns `TotpError::InvalidRetention` for a zero retention or sweep
    /// interval and `TotpError::Io` if the thread cannot be spawned.
    pub fn build(self) -> Result<InMemoryReplayGuard, TotpError> {
        if self.retention.is_zero() {
            return Err(TotpError::InvalidRetention(
                "retention must be positive".to_owned(),
            ));
        }
        let sweep_interval = match self.sweep_interval {
            Some(interval) if interval.is_zero() => {
                return Err(TotpError::InvalidRetention(
                    "sweep interval must be positive".to_owned(),
                ))
            }
            Some(interval) => interval,
            None => (self.retention / 2).max(MIN_SWEEP_INTERVAL),
        };

        let shared = Arc::new(Shared {
            shards: (0..SHARD_COUNT).map(|_| Mutex::default()).collect(),
            hasher: RandomState::new(),
            retention: self.retention,
            closed: AtomicBool::new(false),
        });
        let sweeper = InMemoryReplayGuard::spawn_sweeper(&shared, sweep_interval)?;
        tracing::debug!(
            retention_ms = u64::try_from(self.retention.as_millis()).unwrap_or(u64::MAX),
            sweep_interval_ms = u64::try_from(sweep_interval.as_millis()).unwrap_or(u64::MAX),
            "replay guard started"
        );

        Ok(InMemoryReplayGuard {
            shared,
            sweep_interval,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }
}

/// Retention covering every step `config` accepts, plus
/// [`RETENTION_MARGIN`]: `period * (1 + 2 * drift) + margin`.
#[must_use]
pub fn retention_for(config: &TotpConfig) -> Duration {
    let windows = 1u32.saturating_add(u32::from(config.allowed_drift()).saturating_mul(2));
    config
        .period()
        .saturating_mul(windows)
        .saturating_add(RETENTION_MARGIN)
}

// ── Tests ───────────────────────────────────────────────────────────

//! Secure memory for raw secret bytes.
//!
//! [`SecretHandle`] owns the decoded secret for the duration of one
//! operation:
//! - Zeroes memory on release and on drop, so every exit path (including
//!   `?` early returns) clears the buffer
//! - Locks pages in RAM via `mlock` to prevent swap (best effort)
//! - Masks output in `Debug`/`Display`
//! - Is move-only: no `Clone`, no `Copy`

use std::fmt;

use secrecy::{ExposeSecret, ExposeSecretMut, SecretSlice};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::OtpError;

// ---------------------------------------------------------------------------
// Platform-specific memory locking
// ---------------------------------------------------------------------------

/// RAII guard that unlocks memory on drop.
///
/// When created, locks a memory region via `mlock` to prevent it from being
/// swapped to disk. On drop, calls `munlock` to release the lock.
pub(crate) struct LockedRegion {
    ptr: *const u8,
    len: usize,
    locked: bool,
}

// SAFETY: The pointer is only passed to mlock/munlock, which are
// thread-safe. The pointed-to data is owned by `SecretHandle` and is never
// read through `LockedRegion`.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    /// Attempt to lock a memory region. Returns a guard that unlocks on drop.
    ///
    /// If `mlock` fails (insufficient privileges or quota) the region stays
    /// unlocked and no error is returned.
    #[must_use]
    fn try_lock(ptr: *const u8, len: usize) -> Self {
        let locked = platform::try_mlock(ptr, len);
        if !locked && len > 0 {
            static WARNED: std::sync::Once = std::sync::Once::new();
            WARNED.call_once(|| {
                eprintln!(
                    "[otpkit-core] WARNING: mlock failed — \
                     secret data may be swapped to disk. \
                     Consider increasing RLIMIT_MEMLOCK."
                );
            });
        }
        Self { ptr, len, locked }
    }

    const fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        if self.locked {
            platform::try_munlock(self.ptr, self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// SecretHandle
// ---------------------------------------------------------------------------

/// Scoped owner of raw secret bytes.
///
/// Exactly one owner holds the handle; when it goes out of scope the bytes
/// are overwritten with zeros. [`release`](Self::release) clears early and
/// is idempotent, so an explicit release followed by the implicit one on
/// drop is safe.
pub struct SecretHandle {
    // Declared first so the region is unlocked before `inner` is freed.
    lock: LockedRegion,
    inner: SecretSlice<u8>,
    len: usize,
    released: bool,
}

impl SecretHandle {
    /// Take ownership of `bytes`.
    ///
    /// The contents move into a locked allocation and the source vector is
    /// zeroed before it is freed, so no copy outlives this call.
    #[must_use]
    pub fn wrap(mut bytes: Vec<u8>) -> Self {
        let handle = Self::copy_of(&bytes);
        bytes.zeroize();
        handle
    }

    /// Copy `data` into a new handle. The caller keeps (and must clear)
    /// its own copy.
    #[must_use]
    pub fn copy_of(data: &[u8]) -> Self {
        let inner: SecretSlice<u8> = data.to_vec().into();
        let exposed = inner.expose_secret();
        let lock = LockedRegion::try_lock(exposed.as_ptr(), exposed.len());
        Self {
            lock,
            inner,
            len: data.len(),
            released: false,
        }
    }

    /// Borrow the raw bytes for a cryptographic operation.
    ///
    /// Keep the borrow within a single expression where possible.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Released` after [`release`](Self::release).
    pub fn bytes(&self) -> Result<&[u8], OtpError> {
        if self.released {
            return Err(OtpError::Released);
        }
        Ok(self.inner.expose_secret())
    }

    /// Consume the handle: run `f` over the bytes, then zero them whatever
    /// `f` returned.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Released` (converted into `E`) if the handle was
    /// already released, otherwise whatever `f` returns.
    pub fn use_once<T, E, F>(mut self, f: F) -> Result<T, E>
    where
        E: From<OtpError>,
        F: FnOnce(&[u8]) -> Result<T, E>,
    {
        let result = f(self.bytes()?);
        self.release();
        result
    }

    /// Overwrite the buffer with zeros and mark the handle released.
    pub fn release(&mut self) {
        if !self.released {
            self.inner.expose_secret_mut().zeroize();
            self.released = true;
        }
    }

    /// Length of the secret in bytes. Still reported after release.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the secret holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` once the bytes have been cleared.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// Returns `true` if the underlying memory is `mlock`'d.
    #[must_use]
    pub const fn is_mlocked(&self) -> bool {
        self.lock.is_locked()
    }
}

impl Drop for SecretHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl ZeroizeOnDrop for SecretHandle {}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.released {
            f.write_str("SecretHandle(released)")
        } else {
            write!(f, "SecretHandle({} bytes)", self.len)
        }
    }
}

impl fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Platform-specific implementations
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod platform {
    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock is safe to call with any valid pointer/length pair.
        // If the pointer is invalid, the kernel returns ENOMEM which we handle.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock is safe to call. Failure is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! Busy-wait mutual exclusion.

use std::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
};

use crossbeam_utils::CachePadded;

use crate::loom::{AtomicBool, Backoff, Ordering};

/// A mutual exclusion lock acquired by polling an atomic flag instead of parking the thread.
///
/// Waiting goes through [`Backoff::snooze`](crossbeam_utils::Backoff::snooze): it spins with an
/// exponentially growing number of pause instructions, then falls back to yielding to the
/// scheduler, so that a waiter cannot starve the lock holder on a single-core host.
///
/// Unlike [`std::sync::Mutex`], the lock is never poisoned; a panic while holding it simply
/// releases it during unwinding.
///
/// # Examples
/// ```
/// # use drain_buffer::SpinLock;
/// let lock = SpinLock::new(Vec::new());
/// lock.lock().push(42);
/// assert_eq!(*lock.lock(), vec![42]);
/// ```
pub struct SpinLock<T: ?Sized> {
    locked: CachePadded<AtomicBool>,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`, so the lock hands `T` from thread to thread
// but never shares it.
unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
// SAFETY: see above
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates a new unlocked spin lock.
    pub fn new(value: T) -> Self {
        Self {
            locked: CachePadded::new(AtomicBool::new(false)),
            value: UnsafeCell::new(value),
        }
    }

    /// Consumes the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// Acquires the lock, spinning until it is available.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let backoff = Backoff::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // wait for the flag to look free before retrying the CAS, to keep the cache line shared
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
        SpinLockGuard { lock: self }
    }

    /// Tries to acquire the lock without spinning.
    ///
    /// # Examples
    /// ```
    /// # use drain_buffer::SpinLock;
    /// let lock = SpinLock::new(0);
    /// let guard = lock.lock();
    /// assert!(lock.try_lock().is_none());
    /// drop(guard);
    /// assert!(lock.try_lock().is_some());
    /// ```
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard { lock: self })
    }

    /// Returns `true` if the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Returns a mutable reference to the protected value, without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("SpinLock");
        match self.try_lock() {
            Some(guard) => debug_struct.field("value", &&*guard),
            None => debug_struct.field("value", &format_args!("<locked>")),
        };
        debug_struct.finish()
    }
}

/// RAII guard of a [`SpinLock`]; the lock is released when it is dropped.
#[must_use = "if unused the SpinLock will immediately unlock"]
pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
}

// SAFETY: sharing the guard only shares `&T`
unsafe impl<T: ?Sized + Sync> Sync for SpinLockGuard<'_, T> {}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the guard owns the lock
        unsafe { &*self.lock.value.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the guard owns the lock
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SpinLockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

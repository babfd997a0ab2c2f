//! Concurrency-safe value cell
//!
//! `AtomicCell<T>` is the single place where shared mutable state lives:
//! feature flags, the known-contacts cache and the bootstrap state machine all
//! go through it instead of carrying their own locks.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A shared mutable value guarded by a read/write lock.
///
/// A panic while the lock is held does not make the cell unusable: poisoned
/// guards are recovered, since every mutation is applied as a whole closure.
pub struct AtomicCell<T> {
    inner: RwLock<T>,
}

impl<T> AtomicCell<T> {
    /// Wrap a value
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current value under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.read_guard())
    }

    /// Mutate the value in place under the write lock, returning whatever `f` returns
    pub fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.write_guard())
    }

    /// Overwrite the value
    pub fn set(&self, value: T) {
        *self.write_guard() = value;
    }

    /// Overwrite the value, returning the previous one
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.write_guard(), value)
    }

    /// Consume the cell
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> AtomicCell<T> {
    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.read_guard().clone()
    }
}

impl<T: PartialEq> AtomicCell<T> {
    /// Store `new` only if the current value equals `expected`.
    ///
    /// Returns `true` when the swap happened.
    pub fn compare_and_swap(&self, expected: &T, new: T) -> bool {
        let mut guard = self.write_guard();
        if *guard == *expected {
            *guard = new;
            true
        } else {
            false
        }
    }
}

impl<T: Default> Default for AtomicCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCell").field(&*self.read_guard()).finish()
    }
}

impl<T> From<T> for AtomicCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

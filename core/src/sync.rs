//! Lock helpers.
//!
//! Critical sections in this crate restore their own invariants before
//! returning, so a guard poisoned by a panicking thread still protects
//! consistent data. These helpers recover the guard instead of
//! propagating the poison.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!("recovering poisoned mutex");
        poisoned.into_inner()
    })
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!("recovering poisoned read lock");
        poisoned.into_inner()
    })
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!("recovering poisoned write lock");
        poisoned.into_inner()
    })
}

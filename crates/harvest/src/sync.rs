use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

static LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_lock_poison_once(lock: &'static str) {
    if LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(lock, "lock poisoned; recovered inner value");
    }
}

/// A panic on another thread must not stop the scan, so poisoned locks are entered anyway.
pub(crate) fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, lock: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_lock_poison_once(lock);
            poisoned.into_inner()
        }
    }
}

pub(crate) fn read_or_recover<'a, T>(
    rwlock: &'a RwLock<T>,
    lock: &'static str,
) -> RwLockReadGuard<'a, T> {
    match rwlock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_lock_poison_once(lock);
            poisoned.into_inner()
        }
    }
}

pub(crate) fn write_or_recover<'a, T>(
    rwlock: &'a RwLock<T>,
    lock: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match rwlock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_lock_poison_once(lock);
            poisoned.into_inner()
        }
    }
}

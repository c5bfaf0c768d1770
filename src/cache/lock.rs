//! Poison-tolerant access to the cache's entry table.
//!
//! A panic while a guard is held poisons the lock. Cached pages are
//! disposable, so the guard is taken back and the event logged.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), source, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), source, op, "write")
}

fn recover<G>(result: LockResult<G>, source: &'static str, op: &'static str, mode: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = source,
            op,
            mode,
            "Feed cache lock was poisoned; continuing with possibly stale pages"
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::{panic, sync::Arc, thread};

    use super::*;

    #[test]
    fn poisoned_lock_is_recovered() {
        let lock = Arc::new(RwLock::new(1_u32));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic::panic_any("poison");
        })
        .join();

        assert!(lock.is_poisoned());
        *rw_write(&lock, "test", "set") += 1;
        assert_eq!(*rw_read(&lock, "test", "get"), 2);
    }
}

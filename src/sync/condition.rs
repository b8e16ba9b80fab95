//! Condition signal for blocking handshakes
//!
//! A condition-variable-style primitive over a spin lock: `wait` releases
//! the guard while blocked and re-acquires it before returning, `notify_one`
//! wakes a waiter. The vfork handshake is its only in-crate consumer.
//!
//! Lost-wakeup safety relies on two rules the callers must follow:
//! the waited-on predicate is only changed while holding the lock passed to
//! `wait`, and `notify_one` is called while holding that same lock. Under
//! those rules the epoch read below happens-before the notifier's epoch
//! bump, so a signal between unlock and the epoch check is never missed.

use core::sync::atomic::{AtomicU64, Ordering};
use spin::{Mutex, MutexGuard};

/// A wait condition associated with some lock-guarded state.
pub struct Condition {
    epoch: AtomicU64,
}

impl Condition {
    pub const fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
        }
    }

    /// Atomically release `guard` and block until notified, then re-acquire
    /// the lock. Spurious wakeups are possible; callers re-check their
    /// predicate in a loop.
    pub fn wait<'a, T>(&self, lock: &'a Mutex<T>, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let epoch = self.epoch.load(Ordering::Acquire);
        drop(guard);
        while self.epoch.load(Ordering::Acquire) == epoch {
            core::hint::spin_loop();
        }
        lock.lock()
    }

    /// Wake up one waiting task.
    pub fn notify_one(&self) {
        self.epoch.fetch_add(1, Ordering::Release);
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use std::thread;
    use std::time::Duration;

    struct Shared {
        lock: Mutex<bool>,
        cond: Condition,
    }

    #[test]
    fn notify_wakes_waiter() {
        let shared = Arc::new(Shared {
            lock: Mutex::new(false),
            cond: Condition::new(),
        });

        let waiter = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut done = shared.lock.lock();
                while !*done {
                    done = shared.cond.wait(&shared.lock, done);
                }
            })
        };

        thread::sleep(Duration::from_millis(20));
        {
            let mut done = shared.lock.lock();
            *done = true;
            shared.cond.notify_one();
        }
        waiter.join().unwrap();
    }

    #[test]
    fn signal_before_wait_is_not_lost() {
        let shared = Shared {
            lock: Mutex::new(false),
            cond: Condition::new(),
        };
        {
            let mut done = shared.lock.lock();
            *done = true;
            shared.cond.notify_one();
        }
        // Predicate already true: the wait loop never blocks.
        let done = shared.lock.lock();
        assert!(*done);
    }
}

//! Scheduler admission
//!
//! The scheduler proper lives in the surrounding emulator; this module only
//! implements run-queue admission. A task is admitted exactly once, after
//! both resource policies have fully committed, so the scheduler never
//! observes a half-initialized task.

use crate::task::{Pid, Task};
use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

/// Run-queue front end.
pub struct Scheduler {
    ready: Mutex<VecDeque<Pid>>,
    total_admissions: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            ready: Mutex::new(VecDeque::new()),
            total_admissions: AtomicU64::new(0),
        }
    }

    /// Make a fully constructed task runnable.
    pub fn admit(&self, task: &Task) {
        log::debug!("sched: admitting task {}", task.pid);
        self.ready.lock().push_back(task.pid);
        self.total_admissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether `pid` is sitting on the ready queue.
    pub fn is_runnable(&self, pid: Pid) -> bool {
        self.ready.lock().iter().any(|&p| p == pid)
    }

    /// Total tasks admitted since creation.
    pub fn admissions(&self) -> u64 {
        self.total_admissions.load(Ordering::Relaxed)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

//! Kernel context bundle
//!
//! The task table and the scheduler front end, passed explicitly into every
//! syscall entry point together with the calling task. No process-wide
//! "current task" state exists in this crate.

use crate::sched::Scheduler;
use crate::task::TaskTable;

/// The kernel-side context the syscall layer operates on.
pub struct Kernel {
    pub tasks: TaskTable,
    pub sched: Scheduler,
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            tasks: TaskTable::new(),
            sched: Scheduler::new(),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

//! Task structures and the task table
//!
//! A task is a schedulable unit of execution: a guest CPU snapshot plus
//! shared-or-owned handles to a memory image and a file-descriptor table.
//! Tasks are allocated out of a [`TaskTable`] and destroyed there if
//! construction fails before scheduler admission; afterwards the scheduler
//! owns them until exit.

pub mod context;

pub use context::CpuState;

use crate::errors::{KernelError, KernelResult};
use crate::fs::{FdTable, FilesHandle};
use crate::memory::{MemHandle, MemImage};
use crate::sync::Condition;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicI32, Ordering};
use spin::{Mutex, RwLock};

/// A process/thread ID.
pub type Pid = i32;

/// Upper bound on live tasks.
pub const MAX_TASKS: usize = 4096;

/// Task-exit state, guarded by the task's exit lock.
#[derive(Debug, Default)]
pub struct ExitState {
    /// Set once the child has become independent of its parent's address
    /// space (exec or exit). Predicate of the vfork handshake.
    pub vfork_done: bool,
}

/// A schedulable unit of execution.
pub struct Task {
    /// Task ID, unique for the table's lifetime.
    pub pid: Pid,
    /// Parent task ID (0 for the initial task).
    pub ppid: Pid,
    cpu: Mutex<CpuState>,
    mem: Mutex<MemHandle>,
    files: Mutex<FilesHandle>,
    exit_state: Mutex<ExitState>,
    vfork_done: Condition,
}

impl Task {
    fn new(pid: Pid, ppid: Pid, cpu: CpuState) -> Self {
        Self {
            pid,
            ppid,
            cpu: Mutex::new(cpu),
            mem: Mutex::new(MemImage::new().into_handle()),
            files: Mutex::new(FdTable::new().into_handle()),
            exit_state: Mutex::new(ExitState::default()),
            vfork_done: Condition::new(),
        }
    }

    /// The task's memory-image handle (cloning increments the image's
    /// reference count).
    pub fn mem(&self) -> MemHandle {
        self.mem.lock().clone()
    }

    /// Replace the task's memory-image handle; the previous handle's
    /// reference is released.
    pub fn set_mem(&self, mem: MemHandle) {
        *self.mem.lock() = mem;
    }

    /// The task's file-table handle.
    pub fn files(&self) -> FilesHandle {
        self.files.lock().clone()
    }

    /// Replace the task's file-table handle.
    pub fn set_files(&self, files: FilesHandle) {
        *self.files.lock() = files;
    }

    /// Run `f` against the task's CPU snapshot.
    pub fn with_cpu<R>(&self, f: impl FnOnce(&mut CpuState) -> R) -> R {
        f(&mut self.cpu.lock())
    }

    /// Block the calling task until this task signals vfork independence.
    ///
    /// The sole suspension point of this crate: waits on the task's exit
    /// lock + condition, unconditionally and without timeout.
    pub fn wait_for_vfork_done(&self) {
        let mut exit = self.exit_state.lock();
        while !exit.vfork_done {
            exit = self.vfork_done.wait(&self.exit_state, exit);
        }
    }

    /// Signal vfork independence, waking a parent blocked in
    /// [`Task::wait_for_vfork_done`]. Called by the exec/exit path once the
    /// task no longer runs on its parent's address space.
    pub fn notify_vfork_done(&self) {
        let mut exit = self.exit_state.lock();
        exit.vfork_done = true;
        // Notify while holding the exit lock (see sync::condition).
        self.vfork_done.notify_one();
    }

    /// Whether vfork independence has been signaled.
    pub fn vfork_done(&self) -> bool {
        self.exit_state.lock().vfork_done
    }
}

/// Table of all live tasks.
pub struct TaskTable {
    tasks: RwLock<BTreeMap<Pid, Arc<Task>>>,
    next_pid: AtomicI32,
}

impl TaskTable {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(BTreeMap::new()),
            next_pid: AtomicI32::new(1),
        }
    }

    /// Create the initial task (no parent, empty resources).
    pub fn spawn_init(&self) -> Arc<Task> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let task = Arc::new(Task::new(pid, 0, CpuState::empty()));
        self.tasks.write().insert(pid, task.clone());
        task
    }

    /// Allocate a new task as a child of `parent`.
    ///
    /// The child inherits the parent's CPU snapshot; its memory image and
    /// file table start out as detached placeholders that the resource
    /// duplication policy replaces before the task becomes runnable.
    pub fn allocate(&self, parent: &Task) -> KernelResult<Arc<Task>> {
        let mut tasks = self.tasks.write();
        if tasks.len() >= MAX_TASKS {
            return Err(KernelError::ResourceExhausted);
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let cpu = parent.with_cpu(|cpu| *cpu);
        let task = Arc::new(Task::new(pid, parent.pid, cpu));
        tasks.insert(pid, task.clone());
        Ok(task)
    }

    /// Remove a task from the table, releasing every resource reference it
    /// still holds once the last `Arc` drops.
    pub fn destroy(&self, task: &Arc<Task>) {
        self.tasks.write().remove(&task.pid);
    }

    /// Look up a task by pid.
    pub fn get(&self, pid: Pid) -> Option<Arc<Task>> {
        self.tasks.read().get(&pid).cloned()
    }

    /// Whether a task with `pid` exists.
    pub fn contains(&self, pid: Pid) -> bool {
        self.tasks.read().contains_key(&pid)
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

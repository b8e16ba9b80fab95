//! clone/fork/vfork — task creation
//!
//! Decodes the clone flag word, decides per resource whether the child
//! shares or copies its creator's memory image and file table, sequences
//! the child into existence and, for `vfork`, blocks the caller until the
//! child signals independence.

use crate::errors::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::memory::{uaccess, Addr};
use crate::task::Task;
use alloc::sync::Arc;
use bitflags::bitflags;
use spin::Mutex;

/// Child-exit signal: the only accepted value of the flag word's low byte.
pub const SIGCHLD: u8 = 17;

/// Mask of the legacy exit-signal field packed into the flag word.
const CSIGNAL: u32 = 0x0000_00ff;

bitflags! {
    /// Clone capability bits (host-ABI-compatible values).
    ///
    /// Only `CLONE_VM`, `CLONE_FILES`, `CLONE_VFORK` and
    /// `CLONE_CHILD_SETTID` change behavior here; the rest are accepted
    /// syntactically as forward-compatibility placeholders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CloneFlags: u32 {
        /// Share the virtual memory image between parent and child.
        const CLONE_VM      = 0x0000_0100;
        /// Share filesystem info (cwd, umask).
        const CLONE_FS      = 0x0000_0200;
        /// Share the open-file table.
        const CLONE_FILES   = 0x0000_0400;
        /// Share signal handlers.
        const CLONE_SIGHAND = 0x0000_0800;
        const CLONE_PTRACE  = 0x0000_2000;
        /// Block the parent until the child signals independence.
        const CLONE_VFORK   = 0x0000_4000;
        const CLONE_PARENT  = 0x0000_8000;
        const CLONE_THREAD  = 0x0001_0000;
        const CLONE_NEWNS   = 0x0002_0000;
        const CLONE_SYSVSEM = 0x0004_0000;
        const CLONE_SETTLS  = 0x0008_0000;
        const CLONE_PARENT_SETTID  = 0x0010_0000;
        const CLONE_CHILD_CLEARTID = 0x0020_0000;
        const CLONE_DETACHED = 0x0040_0000;
        const CLONE_UNTRACED = 0x0080_0000;
        /// Store the child pid at a parent-supplied address.
        const CLONE_CHILD_SETTID = 0x0100_0000;
        const CLONE_NEWCGROUP = 0x0200_0000;
        const CLONE_NEWUTS    = 0x0400_0000;
        const CLONE_NEWIPC    = 0x0800_0000;
        const CLONE_NEWUSER   = 0x1000_0000;
        const CLONE_NEWPID    = 0x2000_0000;
        const CLONE_NEWNET    = 0x4000_0000;
        const CLONE_IO        = 0x8000_0000;
    }
}

/// Validated clone request, immutable after decode.
#[derive(Debug, Clone, Copy)]
pub struct CloneArgs {
    pub flags: CloneFlags,
    /// Legacy low-byte field: signal sent to the parent on child exit.
    pub exit_signal: u8,
    /// Where to publish the child pid (`CLONE_CHILD_SETTID`).
    pub child_tid: Addr,
}

impl CloneArgs {
    /// Validate and classify the raw syscall operands.
    ///
    /// Alternate child stacks, TLS pointers and parent-TID publication are
    /// not emulated; a request carrying any of them is rejected outright so
    /// the orchestrator never observes a half-emulated combination.
    pub fn decode(
        raw_flags: u32,
        stack: Addr,
        parent_tid: Addr,
        tls: Addr,
        child_tid: Addr,
    ) -> KernelResult<Self> {
        let flags = CloneFlags::from_bits_truncate(raw_flags & !CSIGNAL);
        let exit_signal = (raw_flags & CSIGNAL) as u8;

        if parent_tid != 0 || tls != 0 {
            log::warn!(
                "clone: parent_tid={:#x}/tls={:#x} not emulated",
                parent_tid,
                tls
            );
            return Err(KernelError::UnsupportedOperand);
        }
        if exit_signal != SIGCHLD {
            log::warn!("clone: exit signal {} != SIGCHLD not emulated", exit_signal);
            return Err(KernelError::UnsupportedOperand);
        }
        if stack != 0 {
            log::warn!("clone: alternate stack {:#x} not emulated", stack);
            return Err(KernelError::UnsupportedOperand);
        }

        Ok(Self {
            flags,
            exit_signal,
            child_tid,
        })
    }
}

/// Memory policy: alias the creator's image under `CLONE_VM`, otherwise
/// give the child a full-range copy-on-write derivative. Mutates the child
/// only (the creator sees at most a reference increment).
fn copy_memory(parent: &Task, child: &Task, flags: CloneFlags) -> KernelResult<()> {
    if flags.contains(CloneFlags::CLONE_VM) {
        child.set_mem(parent.mem());
        return Ok(());
    }
    let image = parent.mem().lock().fork_cow();
    child.set_mem(Arc::new(Mutex::new(image)));
    Ok(())
}

/// File-table policy: alias under `CLONE_FILES`, otherwise deep-duplicate.
/// Collaborator failures propagate without partial mutation of the child.
fn copy_files(parent: &Task, child: &Task, flags: CloneFlags) -> KernelResult<()> {
    if flags.contains(CloneFlags::CLONE_FILES) {
        child.set_files(parent.files());
        return Ok(());
    }
    let table = parent.files().lock().duplicate()?;
    child.set_files(table.into_handle());
    Ok(())
}

/// Task construction orchestrator.
///
/// Steps are strictly ordered and each failure aborts the remainder; the
/// entry point destroys the half-constructed child, which releases every
/// reference increment or owned copy taken so far.
fn copy_task(kernel: &Kernel, parent: &Task, child: &Task, args: &CloneArgs) -> KernelResult<()> {
    // 1-2. Resource policies, memory first. If memory fails, the file
    //      step never runs.
    copy_memory(parent, child, args.flags)?;
    copy_files(parent, child, args.flags)?;

    // 3. The child's clone call site observes a return value of 0.
    child.with_cpu(|cpu| cpu.set_syscall_result(0));

    // 4. Publish the child pid into the parent's address space. This
    //    happens before admission, so a fault never leaks a runnable task.
    if args.flags.contains(CloneFlags::CLONE_CHILD_SETTID) {
        uaccess::put_u32(&parent.mem(), args.child_tid, child.pid as u32)?;
    }

    // 5. Both resources are committed; the child may run.
    kernel.sched.admit(child);

    // 6. vfork: suspend the caller until the child reports independence.
    if args.flags.contains(CloneFlags::CLONE_VFORK) {
        child.wait_for_vfork_done();
    }

    Ok(())
}

/// `clone(flags, stack, parent_tid, tls, child_tid)` — create a new task
/// from `current`. Returns the child pid, or a negative errno.
pub fn sys_clone(
    kernel: &Kernel,
    current: &Arc<Task>,
    flags: u32,
    stack: Addr,
    parent_tid: Addr,
    tls: Addr,
    child_tid: Addr,
) -> i32 {
    log::debug!(
        "clone(flags={:#x}, stack={:#x}, ptid={:#x}, tls={:#x}, ctid={:#x})",
        flags,
        stack,
        parent_tid,
        tls,
        child_tid
    );

    let args = match CloneArgs::decode(flags, stack, parent_tid, tls, child_tid) {
        Ok(args) => args,
        Err(err) => return err.to_syscall_ret(),
    };

    let child = match kernel.tasks.allocate(current) {
        Ok(child) => child,
        Err(err) => return err.to_syscall_ret(),
    };

    if let Err(err) = copy_task(kernel, current, &child, &args) {
        kernel.tasks.destroy(&child);
        log::debug!("clone: failed with {}, task {} destroyed", err, child.pid);
        return err.to_syscall_ret();
    }

    log::info!("clone: parent {} -> child {}", current.pid, child.pid);
    child.pid
}

/// `fork()` — full duplication of memory and files.
pub fn sys_fork(kernel: &Kernel, current: &Arc<Task>) -> i32 {
    sys_clone(kernel, current, SIGCHLD as u32, 0, 0, 0, 0)
}

/// `vfork()` — shared memory, parent blocked until the child signals
/// independence.
pub fn sys_vfork(kernel: &Kernel, current: &Arc<Task>) -> i32 {
    let flags = (CloneFlags::CLONE_VFORK | CloneFlags::CLONE_VM).bits() | SIGCHLD as u32;
    sys_clone(kernel, current, flags, 0, 0, 0, 0)
}

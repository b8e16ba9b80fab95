//! emukern — process creation core for a Linux-syscall-compatible
//! emulation kernel.
//!
//! Implements the `clone`/`fork`/`vfork` family over a guest task model:
//! per-flag sharing or copy-on-write duplication of the address space and
//! the file-descriptor table, plus the blocking vfork handshake.
//!
//! The surrounding emulator supplies the scheduler proper, the page-fault
//! path and the exec/exit paths; this crate only exposes the narrow
//! interfaces those collaborators drive (run-queue admission,
//! [`task::Task::notify_vfork_done`]).

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod errors;
pub mod fs;
pub mod kernel;
pub mod memory;
pub mod sched;
pub mod sync;
pub mod syscall;
pub mod task;

#[cfg(test)]
mod tests;

pub use errors::{KernelError, KernelResult};
pub use kernel::Kernel;

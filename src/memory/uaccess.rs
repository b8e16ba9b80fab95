//! Guest user-memory accessors
//!
//! Thin helpers over a [`MemHandle`] for the fixed-width reads and writes
//! the syscall layer needs (e.g. publishing a child pid through
//! `CLONE_CHILD_SETTID`). Guest integers are little-endian.

use super::{Addr, MemHandle};
use crate::errors::KernelResult;

/// Write a `u32` into guest memory.
pub fn put_u32(mem: &MemHandle, addr: Addr, value: u32) -> KernelResult<()> {
    mem.lock().write_bytes(addr, &value.to_le_bytes())
}

/// Read a `u32` from guest memory.
pub fn get_u32(mem: &MemHandle, addr: Addr) -> KernelResult<u32> {
    let mut buf = [0u8; 4];
    mem.lock().read_bytes(addr, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

//! File subsystem — per-task file-descriptor tables.

pub mod fdtable;

// Re-exports
pub use fdtable::{Fd, FdEntry, FdTable, FilesHandle, OpenFile, FD_CLOEXEC};

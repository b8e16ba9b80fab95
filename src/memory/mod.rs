//! Guest memory subsystem
//!
//! A guest address space is a sparse arena of 4 KiB pages over a 32-bit
//! address range. Duplication is copy-on-write: a forked image shares every
//! physical page with its source until one side writes it.

pub mod image;
pub mod uaccess;

// Re-exports
pub use image::{MemHandle, MemImage, Page};

/// Guest virtual address (32-bit guest machine).
pub type Addr = u32;

/// Size of a guest page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Number of pages in a guest address space (4 GiB / 4 KiB).
pub const MEM_PAGES: usize = 1 << 20;

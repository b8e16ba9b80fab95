//! File Descriptor tables
//!
//! A task's set of open file handles. The table is either shared between
//! tasks (handle aliasing — open/close by one sharer is visible to all) or
//! deep-duplicated: a new table with independent entries that still
//! reference the same underlying open files.

use crate::errors::{KernelError, KernelResult};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

/// File descriptor type.
pub type Fd = i32;

/// Close-on-exec descriptor flag.
pub const FD_CLOEXEC: u32 = 1;

/// Default per-task descriptor limit (RLIMIT_NOFILE soft default).
pub const DEFAULT_FD_LIMIT: usize = 1024;

/// An underlying open file, shared by every descriptor referencing it.
#[derive(Debug)]
pub struct OpenFile {
    /// Human-readable description (path or pseudo-file name).
    pub description: String,
}

impl OpenFile {
    pub fn new(description: &str) -> Arc<Self> {
        Arc::new(Self {
            description: String::from(description),
        })
    }
}

/// One slot of a descriptor table.
#[derive(Debug, Clone)]
pub struct FdEntry {
    /// The open file this descriptor refers to.
    pub file: Arc<OpenFile>,
    /// Per-descriptor flags (`FD_CLOEXEC`).
    pub flags: u32,
}

/// Shared-ownership handle to a descriptor table.
pub type FilesHandle = Arc<Mutex<FdTable>>;

/// A task's file-descriptor table.
pub struct FdTable {
    entries: BTreeMap<Fd, FdEntry>,
    limit: usize,
}

impl FdTable {
    /// Create an empty table with the default descriptor limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_FD_LIMIT)
    }

    /// Create an empty table with an explicit descriptor limit.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            limit,
        }
    }

    /// Wrap the table into a shared handle.
    pub fn into_handle(self) -> FilesHandle {
        Arc::new(Mutex::new(self))
    }

    /// Install an open file at the lowest free descriptor.
    pub fn install(&mut self, file: Arc<OpenFile>) -> KernelResult<Fd> {
        if self.entries.len() >= self.limit {
            return Err(KernelError::ResourceExhausted);
        }
        let mut fd: Fd = 0;
        while self.entries.contains_key(&fd) {
            fd += 1;
        }
        self.entries.insert(fd, FdEntry { file, flags: 0 });
        Ok(fd)
    }

    /// Remove a descriptor, returning its entry if it existed.
    pub fn close(&mut self, fd: Fd) -> Option<FdEntry> {
        self.entries.remove(&fd)
    }

    /// Look up a descriptor.
    pub fn get(&self, fd: Fd) -> Option<&FdEntry> {
        self.entries.get(&fd)
    }

    /// Number of open descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deep-duplicate the table for a new task.
    ///
    /// The copy has independent entries (closing a descriptor on one side
    /// does not affect the other) referencing the same underlying open
    /// files. Collaborator contract: allocation failure surfaces as
    /// `ResourceUnavailable`.
    pub fn duplicate(&self) -> KernelResult<FdTable> {
        Ok(FdTable {
            entries: self.entries.clone(),
            limit: self.limit,
        })
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

//! Memory image: page arena with copy-on-write duplication
//!
//! Pages are reference-counted (`Arc<Page>`). Forking an image clones the
//! page map only — every page starts out shared between the two images, and
//! the first write through either side takes a private copy of the touched
//! page. Index-based page entries, never raw pointers.

use super::{Addr, MEM_PAGES, PAGE_SIZE};
use crate::errors::{KernelError, KernelResult};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use spin::Mutex;

/// A single guest page frame.
#[derive(Clone)]
pub struct Page {
    bytes: [u8; PAGE_SIZE],
}

impl Page {
    /// A fresh zero-filled page.
    pub fn zeroed() -> Self {
        Self {
            bytes: [0; PAGE_SIZE],
        }
    }
}

/// Shared-ownership handle to a memory image.
///
/// Cloning the handle increments the image reference count; all holders
/// observe the same image state (thread semantics under `CLONE_VM`).
pub type MemHandle = Arc<Mutex<MemImage>>;

/// An address space abstraction over a fixed number of pages.
pub struct MemImage {
    /// Mapped pages, keyed by page index. Absent entries are unmapped.
    pages: BTreeMap<usize, Arc<Page>>,
    /// Number of private copies taken to break page sharing.
    cow_breaks: u64,
}

impl MemImage {
    /// Create an empty image (no pages mapped).
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
            cow_breaks: 0,
        }
    }

    /// Wrap an image into a shared handle.
    pub fn into_handle(self) -> MemHandle {
        Arc::new(Mutex::new(self))
    }

    /// Map `count` zero-filled pages starting at `first_page`, replacing
    /// any pages already mapped in that range.
    pub fn map_zeroed(&mut self, first_page: usize, count: usize) -> KernelResult<()> {
        let end = first_page
            .checked_add(count)
            .ok_or(KernelError::InvalidAddress)?;
        if end > MEM_PAGES {
            return Err(KernelError::InvalidAddress);
        }
        for index in first_page..end {
            self.pages.insert(index, Arc::new(Page::zeroed()));
        }
        Ok(())
    }

    /// Whether the page at `index` is mapped.
    pub fn is_mapped(&self, index: usize) -> bool {
        self.pages.contains_key(&index)
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.pages.len()
    }

    /// Number of private page copies taken so far (COW breaks).
    pub fn cow_breaks(&self) -> u64 {
        self.cow_breaks
    }

    /// Full-range copy-on-write duplicate of this image.
    ///
    /// The logical content is a complete copy; physically every page is
    /// shared with `self` until first write on either side.
    pub fn fork_cow(&self) -> MemImage {
        MemImage {
            pages: self.pages.clone(),
            cow_breaks: 0,
        }
    }

    /// Read `buf.len()` bytes at guest address `addr`.
    ///
    /// Fails with `InvalidAddress` if any byte of the range is unmapped;
    /// nothing is read in that case.
    pub fn read_bytes(&self, addr: Addr, buf: &mut [u8]) -> KernelResult<()> {
        self.check_range(addr, buf.len())?;
        let start = addr as usize;
        let mut read = 0usize;
        while read < buf.len() {
            let pos = start + read;
            let offset = pos % PAGE_SIZE;
            let chunk = core::cmp::min(PAGE_SIZE - offset, buf.len() - read);
            let page = &self.pages[&(pos / PAGE_SIZE)];
            buf[read..read + chunk].copy_from_slice(&page.bytes[offset..offset + chunk]);
            read += chunk;
        }
        Ok(())
    }

    /// Write `buf` at guest address `addr`.
    ///
    /// The whole range is validated before any byte is written, so a fault
    /// never leaves a partial write behind. Writing a page still shared
    /// with another image takes a private copy first.
    pub fn write_bytes(&mut self, addr: Addr, buf: &[u8]) -> KernelResult<()> {
        self.check_range(addr, buf.len())?;
        let start = addr as usize;
        let mut written = 0usize;
        while written < buf.len() {
            let pos = start + written;
            let index = pos / PAGE_SIZE;
            let offset = pos % PAGE_SIZE;
            let chunk = core::cmp::min(PAGE_SIZE - offset, buf.len() - written);

            let page = self.pages.get_mut(&index).ok_or(KernelError::InvalidAddress)?;
            if Arc::strong_count(page) > 1 {
                self.cow_breaks += 1;
            }
            // Clones the page iff it is still shared.
            let frame = Arc::make_mut(page);
            frame.bytes[offset..offset + chunk].copy_from_slice(&buf[written..written + chunk]);
            written += chunk;
        }
        Ok(())
    }

    /// Whether a page frame is physically shared with another image.
    pub fn page_is_shared(&self, index: usize) -> bool {
        self.pages
            .get(&index)
            .map(|p| Arc::strong_count(p) > 1)
            .unwrap_or(false)
    }

    fn check_range(&self, addr: Addr, len: usize) -> KernelResult<()> {
        if len == 0 {
            return Ok(());
        }
        // u64 arithmetic: the 4 GiB guest range does not fit a 32-bit usize.
        let start = addr as u64;
        let end = start
            .checked_add(len as u64)
            .ok_or(KernelError::InvalidAddress)?;
        if end > (MEM_PAGES as u64) * (PAGE_SIZE as u64) {
            return Err(KernelError::InvalidAddress);
        }
        let first = (start / PAGE_SIZE as u64) as usize;
        let last = ((end - 1) / PAGE_SIZE as u64) as usize;
        for index in first..=last {
            if !self.pages.contains_key(&index) {
                return Err(KernelError::InvalidAddress);
            }
        }
        Ok(())
    }
}

impl Default for MemImage {
    fn default() -> Self {
        Self::new()
    }
}

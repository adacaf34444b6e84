use crate::storage::disk::DiskManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PAGE_SIZE};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// In-memory page store. No disk I/O; keeps counters so callers can observe
/// exactly how much traffic reached the disk layer.
#[derive(Default)]
pub struct MemoryDiskManager {
    pages: DashMap<PageId, Box<[u8; PAGE_SIZE]>>,
    deallocated: DashSet<PageId>,
    next_page_id: AtomicU32,
    reads: AtomicUsize,
    writes: AtomicUsize,
    deallocations: AtomicUsize,
}

impl MemoryDiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn num_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn num_deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }

    pub fn is_deallocated(&self, page_id: PageId) -> bool {
        self.deallocated.contains(&page_id)
    }

    /// Copy of the persisted bytes of `page_id`, if it was ever written.
    pub fn page_bytes(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.pages.get(&page_id).map(|data| data.to_vec())
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        self.reads.fetch_add(1, Ordering::SeqCst);

        match self.pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(&data[..]),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        if data.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }
        let mut bytes = Box::new([0u8; PAGE_SIZE]);
        bytes.copy_from_slice(data);
        self.writes.fetch_add(1, Ordering::SeqCst);

        self.pages.insert(page_id, bytes);
        self.deallocated.remove(&page_id);
        Ok(())
    }

    fn allocate_page(&self) -> StorageResult<PageId> {
        Ok(PageId(self.next_page_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.deallocated.insert(page_id);
    }
}

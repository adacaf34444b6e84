//! Disk collaborators of the buffer pool.
//!
//! The buffer pool never touches files directly. Everything it needs from
//! persistent storage goes through [`DiskManager`]: reading and writing whole
//! pages by id, and the on-disk space bookkeeping for allocation and
//! deallocation.

pub mod memory;
pub mod page_manager;

pub use memory::MemoryDiskManager;
pub use page_manager::PageManager;

use crate::storage::error::StorageResult;
use crate::storage::page::PageId;

pub trait DiskManager: Send + Sync {
    /// Fill `buf` with the persisted bytes of `page_id`.
    /// The buffer must be exactly PAGE_SIZE bytes. Never-written pages read as zeros.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()>;

    /// Persist `data` as the contents of `page_id` before returning.
    fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()>;

    /// Reserve on-disk space for one more page.
    fn allocate_page(&self) -> StorageResult<PageId>;

    /// Mark the on-disk slot of `page_id` as reclaimable.
    fn deallocate_page(&self, page_id: PageId);
}

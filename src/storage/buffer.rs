pub mod frame;
pub mod guard;
pub mod instance;
pub mod lru;
pub mod parallel;
pub mod replacer;

pub use frame::{Frame, PageData, PageHandle};
pub use guard::{PageReadGuard, PageWriteGuard};
pub use instance::BufferPoolManagerInstance;
pub use lru::LruReplacer;
pub use parallel::ParallelBufferPoolManager;
pub use replacer::{FrameId, Replacer};

use crate::storage::error::StorageResult;
use crate::storage::page::PageId;

/// Page-level interface the access methods program against. Implemented by a
/// single [`BufferPoolManagerInstance`] and by the sharded
/// [`ParallelBufferPoolManager`].
pub trait BufferPool: Send + Sync {
    /// Pin a page, loading it from disk on a miss. Fails with
    /// `StorageError::BufferPoolFull` when every frame is pinned.
    fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle<'_>>;

    /// Create and pin a zeroed page.
    fn new_page(&self) -> StorageResult<(PageId, PageHandle<'_>)>;

    /// Release one pin, or-ing in the dirty flag.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;

    fn delete_page(&self, page_id: PageId) -> bool;

    /// Write a resident page back if dirty. `Ok(false)` if not resident.
    fn flush_page(&self, page_id: PageId) -> StorageResult<bool>;

    fn flush_all(&self) -> StorageResult<()>;

    /// Total number of frames.
    fn pool_size(&self) -> usize;

    fn fetch_page_read(&self, page_id: PageId) -> StorageResult<PageReadGuard<'_>>
    where
        Self: Sized,
    {
        let handle = self.fetch_page(page_id)?;
        Ok(PageReadGuard::new(self, handle))
    }

    fn fetch_page_write(&self, page_id: PageId) -> StorageResult<PageWriteGuard<'_>>
    where
        Self: Sized,
    {
        let handle = self.fetch_page(page_id)?;
        Ok(PageWriteGuard::new(self, handle))
    }

    fn new_page_write(&self) -> StorageResult<(PageId, PageWriteGuard<'_>)>
    where
        Self: Sized,
    {
        let (page_id, handle) = self.new_page()?;
        Ok((page_id, PageWriteGuard::new(self, handle)))
    }
}

impl BufferPool for BufferPoolManagerInstance {
    fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle<'_>> {
        BufferPoolManagerInstance::fetch_page(self, page_id)
    }

    fn new_page(&self) -> StorageResult<(PageId, PageHandle<'_>)> {
        BufferPoolManagerInstance::new_page(self)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        BufferPoolManagerInstance::unpin_page(self, page_id, is_dirty)
    }

    fn delete_page(&self, page_id: PageId) -> bool {
        BufferPoolManagerInstance::delete_page(self, page_id)
    }

    fn flush_page(&self, page_id: PageId) -> StorageResult<bool> {
        BufferPoolManagerInstance::flush_page(self, page_id)
    }

    fn flush_all(&self) -> StorageResult<()> {
        BufferPoolManagerInstance::flush_all(self)
    }

    fn pool_size(&self) -> usize {
        BufferPoolManagerInstance::pool_size(self)
    }
}

impl BufferPool for ParallelBufferPoolManager {
    fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle<'_>> {
        ParallelBufferPoolManager::fetch_page(self, page_id)
    }

    fn new_page(&self) -> StorageResult<(PageId, PageHandle<'_>)> {
        ParallelBufferPoolManager::new_page(self)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        ParallelBufferPoolManager::unpin_page(self, page_id, is_dirty)
    }

    fn delete_page(&self, page_id: PageId) -> bool {
        ParallelBufferPoolManager::delete_page(self, page_id)
    }

    fn flush_page(&self, page_id: PageId) -> StorageResult<bool> {
        ParallelBufferPoolManager::flush_page(self, page_id)
    }

    fn flush_all(&self) -> StorageResult<()> {
        ParallelBufferPoolManager::flush_all(self)
    }

    fn pool_size(&self) -> usize {
        ParallelBufferPoolManager::pool_size(self)
    }
}

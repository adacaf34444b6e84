use super::frame::{PageData, PageHandle};
use super::BufferPool;
use crate::storage::page::{PageId, PAGE_SIZE};
use log::warn;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};

/// Shared access to a pinned page. Dropping the guard releases the latch and
/// then the pin, exactly once.
pub struct PageReadGuard<'a> {
    pool: &'a dyn BufferPool,
    page_id: PageId,
    // Taken in `drop` so the latch is gone before the pool lock is requested
    data: Option<RwLockReadGuard<'a, PageData>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(pool: &'a dyn BufferPool, handle: PageHandle<'a>) -> Self {
        Self {
            pool,
            page_id: handle.page_id(),
            data: Some(handle.read()),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = [u8; PAGE_SIZE];

    fn deref(&self) -> &Self::Target {
        let data = self.data.as_ref().expect("page latch held until drop");
        &***data
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.data.take();
        if !self.pool.unpin_page(self.page_id, false) {
            warn!("read guard for page {} found it already unpinned", self.page_id);
        }
    }
}

/// Exclusive access to a pinned page. The page is reported dirty on drop if
/// its bytes were borrowed mutably.
pub struct PageWriteGuard<'a> {
    pool: &'a dyn BufferPool,
    page_id: PageId,
    data: Option<RwLockWriteGuard<'a, PageData>>,
    modified: bool,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(pool: &'a dyn BufferPool, handle: PageHandle<'a>) -> Self {
        Self {
            pool,
            page_id: handle.page_id(),
            data: Some(handle.write()),
            modified: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = [u8; PAGE_SIZE];

    fn deref(&self) -> &Self::Target {
        let data = self.data.as_ref().expect("page latch held until drop");
        &***data
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.modified = true;
        let data = self.data.as_mut().expect("page latch held until drop");
        &mut ***data
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.data.take();
        if !self.pool.unpin_page(self.page_id, self.modified) {
            warn!("write guard for page {} found it already unpinned", self.page_id);
        }
    }
}

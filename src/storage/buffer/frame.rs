use super::replacer::FrameId;
use crate::storage::page::{PageId, PAGE_SIZE};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type PageData = Box<[u8; PAGE_SIZE]>;

/// A PAGE_SIZE memory slot. The bytes sit behind a per-frame latch that is
/// separate from the instance metadata lock.
pub struct Frame {
    id: FrameId,
    data: RwLock<PageData>,
}

impl Frame {
    pub(crate) fn new(id: FrameId) -> Self {
        Self {
            id,
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, PageData> {
        self.data.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, PageData> {
        self.data.write()
    }

    /// Shared latch, or None while a writer holds the frame.
    pub(crate) fn try_read(&self) -> Option<RwLockReadGuard<'_, PageData>> {
        self.data.try_read()
    }
}

/// Bookkeeping for one frame. Only read or written under the instance lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FrameMeta {
    pub page_id: Option<PageId>,
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl FrameMeta {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A pinned page handed out by a buffer pool.
///
/// The handle does not release its pin on drop; the holder must call
/// `unpin_page` exactly once, after releasing any latch taken through
/// [`PageHandle::read`] or [`PageHandle::write`]. Prefer the RAII guards
/// (`fetch_page_read`, `fetch_page_write`, `new_page_write`) which do both.
pub struct PageHandle<'a> {
    page_id: PageId,
    frame: &'a Frame,
}

impl<'a> PageHandle<'a> {
    pub(crate) fn new(page_id: PageId, frame: &'a Frame) -> Self {
        Self { page_id, frame }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame.id()
    }

    /// Shared latch on the page bytes.
    pub fn read(&self) -> RwLockReadGuard<'a, PageData> {
        self.frame.read()
    }

    /// Exclusive latch on the page bytes. Modifications must be reported
    /// through `unpin_page(page_id, true)`.
    pub fn write(&self) -> RwLockWriteGuard<'a, PageData> {
        self.frame.write()
    }
}

impl std::fmt::Debug for PageHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_zeroed() {
        let frame = Frame::new(3);
        assert_eq!(frame.id(), 3);
        assert!(frame.read().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_meta_reset() {
        let mut meta = FrameMeta {
            page_id: Some(PageId(4)),
            pin_count: 2,
            is_dirty: true,
        };
        meta.reset();
        assert_eq!(meta, FrameMeta::default());
        assert_eq!(meta.page_id, None);
    }

    #[test]
    fn test_handle_latches() {
        let frame = Frame::new(0);
        let handle = PageHandle::new(PageId(9), &frame);
        handle.write()[0] = 5;
        assert_eq!(handle.read()[0], 5);
        assert_eq!(handle.page_id(), PageId(9));
        assert_eq!(handle.frame_id(), 0);
    }
}

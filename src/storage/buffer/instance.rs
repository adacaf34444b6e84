use super::frame::{Frame, FrameMeta, PageHandle};
use super::lru::LruReplacer;
use super::replacer::{FrameId, Replacer};
use crate::storage::disk::DiskManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::storage::wal::LogManager;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One buffer pool shard: a fixed array of frames plus the metadata that
/// decides which page lives where.
///
/// Page bytes are guarded by per-frame latches. Everything else (page table,
/// free list, replacer, pin counts, dirty flags) is guarded by a single
/// instance lock. All disk I/O (eviction write-back, fetch-miss reads and
/// flushes) runs while that lock is held.
pub struct BufferPoolManagerInstance {
    pool_size: usize,
    num_instances: u32,
    instance_index: u32,
    frames: Box<[Frame]>,
    state: Mutex<InstanceState>,
    disk: Arc<dyn DiskManager>,
    log_manager: Option<Arc<dyn LogManager>>,
}

struct InstanceState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: Box<dyn Replacer>,
    meta: Vec<FrameMeta>,
    /// None once the id space is used up
    next_page_id: Option<u32>,
}

impl BufferPoolManagerInstance {
    /// Create a standalone instance that owns the whole page id space.
    pub fn new(pool_size: usize, disk: Arc<dyn DiskManager>) -> Self {
        Self::new_sharded(pool_size, 1, 0, disk)
    }

    /// Create shard `instance_index` of `num_instances`. Every page id this
    /// instance allocates satisfies `id % num_instances == instance_index`.
    pub fn new_sharded(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk: Arc<dyn DiskManager>,
    ) -> Self {
        assert!(num_instances > 0, "a buffer pool needs at least one instance");
        assert!(
            instance_index < num_instances,
            "instance index {} out of range for {} instances",
            instance_index,
            num_instances
        );

        let frames = (0..pool_size).map(Frame::new).collect();
        let state = InstanceState {
            page_table: HashMap::with_capacity(pool_size),
            // Initially, every frame is free
            free_list: (0..pool_size).collect(),
            replacer: Box::new(LruReplacer::new(pool_size)),
            meta: vec![FrameMeta::default(); pool_size],
            next_page_id: Some(instance_index),
        };

        Self {
            pool_size,
            num_instances,
            instance_index,
            frames,
            state: Mutex::new(state),
            disk,
            log_manager: None,
        }
    }

    /// Swap in a different replacement policy. Intended for freshly built instances.
    pub fn with_replacer(mut self, replacer: Box<dyn Replacer>) -> Self {
        self.state.get_mut().replacer = replacer;
        self
    }

    pub fn with_log_manager(mut self, log_manager: Arc<dyn LogManager>) -> Self {
        self.log_manager = Some(log_manager);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn instance_index(&self) -> u32 {
        self.instance_index
    }

    pub fn num_instances(&self) -> u32 {
        self.num_instances
    }

    pub fn log_manager(&self) -> Option<&Arc<dyn LogManager>> {
        self.log_manager.as_ref()
    }

    /// Pin `page_id`, reading it from disk if it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle<'_>> {
        self.validate_page_id(page_id);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.meta[frame_id].pin_count += 1;
            state.replacer.untrack(frame_id);
            return Ok(PageHandle::new(page_id, &self.frames[frame_id]));
        }

        let frame_id = self.acquire_frame(state)?;
        let frame = &self.frames[frame_id];
        {
            let mut data = frame.write();
            if let Err(e) = self.disk.read_page(page_id, data.as_mut_slice()) {
                data.fill(0);
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        }

        state.meta[frame_id] = FrameMeta {
            page_id: Some(page_id),
            pin_count: 1,
            is_dirty: false,
        };
        state.page_table.insert(page_id, frame_id);
        trace!("loaded page {} into frame {}", page_id, frame_id);

        Ok(PageHandle::new(page_id, frame))
    }

    /// Allocate a fresh zeroed page and pin it. No page id is consumed when
    /// the pool is exhausted.
    pub fn new_page(&self) -> StorageResult<(PageId, PageHandle<'_>)> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.next_page_id.is_none() {
            return Err(StorageError::PageIdsExhausted);
        }
        let frame_id = self.acquire_frame(state)?;
        let page_id = self.allocate_page(state)?;

        let frame = &self.frames[frame_id];
        frame.write().fill(0);
        state.meta[frame_id] = FrameMeta {
            page_id: Some(page_id),
            pin_count: 1,
            is_dirty: false,
        };
        state.page_table.insert(page_id, frame_id);
        trace!("new page {} in frame {}", page_id, frame_id);

        Ok((page_id, PageHandle::new(page_id, frame)))
    }

    /// Drop one pin on `page_id`. A `false` `is_dirty` never clears an
    /// existing dirty flag. Returns false if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.validate_page_id(page_id);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let meta = &mut state.meta[frame_id];
        if meta.pin_count == 0 {
            warn!("unpin of page {} with pin count 0", page_id);
            return false;
        }

        meta.is_dirty |= is_dirty;
        meta.pin_count -= 1;
        if meta.pin_count == 0 {
            state.replacer.track(frame_id);
        }
        true
    }

    /// Remove `page_id` from the pool and return its frame to the free list.
    /// The disk layer is always told the page may be reclaimed. Returns false
    /// only if the page is resident and pinned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        self.validate_page_id(page_id);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        self.disk.deallocate_page(page_id);
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };
        if state.meta[frame_id].pin_count > 0 {
            debug!("cannot delete page {}: still pinned", page_id);
            return false;
        }

        state.page_table.remove(&page_id);
        state.replacer.untrack(frame_id);
        state.meta[frame_id].reset();
        self.frames[frame_id].write().fill(0);
        state.free_list.push_back(frame_id);
        true
    }

    /// Write `page_id` back if it is dirty. Returns false if it is not resident.
    ///
    /// Pin counts and replacer order are left alone. If a caller holds the
    /// frame's write latch, the instance lock is dropped while waiting for it
    /// and the lookup starts over.
    pub fn flush_page(&self, page_id: PageId) -> StorageResult<bool> {
        self.validate_page_id(page_id);
        loop {
            let mut guard = self.state.lock();
            let Some(&frame_id) = guard.page_table.get(&page_id) else {
                return Ok(false);
            };
            if !guard.meta[frame_id].is_dirty {
                return Ok(true);
            }

            let frame = &self.frames[frame_id];
            match frame.try_read() {
                Some(data) => {
                    self.disk.write_page(page_id, data.as_slice())?;
                    guard.meta[frame_id].is_dirty = false;
                    return Ok(true);
                }
                None => {
                    drop(guard);
                    trace!("flush of page {} waiting for its writer", page_id);
                    drop(frame.read());
                }
            }
        }
    }

    /// Write back every resident dirty page, pinned or not.
    pub fn flush_all(&self) -> StorageResult<()> {
        let mut write_latched = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            for (&page_id, &frame_id) in &state.page_table {
                let meta = &mut state.meta[frame_id];
                if !meta.is_dirty {
                    continue;
                }
                match self.frames[frame_id].try_read() {
                    Some(data) => {
                        self.disk.write_page(page_id, data.as_slice())?;
                        meta.is_dirty = false;
                    }
                    None => write_latched.push(page_id),
                }
            }
        }

        for page_id in write_latched {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| state.meta[frame_id].pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| state.meta[frame_id].is_dirty)
    }

    /// Number of frames the replacer may currently evict.
    pub fn replacer_size(&self) -> usize {
        self.state.lock().replacer.size()
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Resident page ids in ascending order.
    pub fn resident_pages(&self) -> Vec<PageId> {
        let mut pages: Vec<_> = self.state.lock().page_table.keys().copied().collect();
        pages.sort();
        pages
    }

    /// Reserve a frame for a new resident page: free list first, then a
    /// replacer victim. A dirty victim is written back before reuse. On
    /// success the frame is unmapped and its metadata reset.
    fn acquire_frame(&self, state: &mut InstanceState) -> StorageResult<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.victim().ok_or(StorageError::BufferPoolFull)?;
        let meta = state.meta[frame_id];
        if let Some(old_page_id) = meta.page_id {
            if meta.is_dirty {
                if let Err(e) = self.write_frame(old_page_id, frame_id) {
                    state.replacer.track(frame_id);
                    return Err(e);
                }
                debug!("evicted dirty page {} from frame {}", old_page_id, frame_id);
            } else {
                trace!("evicted page {} from frame {}", old_page_id, frame_id);
            }
            state.page_table.remove(&old_page_id);
        }
        state.meta[frame_id].reset();

        Ok(frame_id)
    }

    fn allocate_page(&self, state: &mut InstanceState) -> StorageResult<PageId> {
        let page_id = state
            .next_page_id
            .map(PageId)
            .ok_or(StorageError::PageIdsExhausted)?;
        state.next_page_id = page_id.0.checked_add(self.num_instances);
        self.validate_page_id(page_id);
        Ok(page_id)
    }

    /// Panics if `page_id` belongs to another shard.
    fn validate_page_id(&self, page_id: PageId) {
        assert_eq!(
            page_id.0 % self.num_instances,
            self.instance_index,
            "page {} does not belong to buffer pool instance {} of {}",
            page_id,
            self.instance_index,
            self.num_instances
        );
    }

    fn write_frame(&self, page_id: PageId, frame_id: FrameId) -> StorageResult<()> {
        let data = self.frames[frame_id].read();
        self.disk.write_page(page_id, data.as_slice())
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let state = self.state.lock();

        let mut mapped = vec![false; self.pool_size];
        for (&page_id, &frame_id) in &state.page_table {
            assert_eq!(state.meta[frame_id].page_id, Some(page_id));
            assert!(!mapped[frame_id], "frame {} mapped twice", frame_id);
            mapped[frame_id] = true;
        }
        for &frame_id in &state.free_list {
            assert!(!mapped[frame_id], "frame {} both free and mapped", frame_id);
            assert_eq!(state.meta[frame_id], FrameMeta::default());
        }
        assert_eq!(state.page_table.len() + state.free_list.len(), self.pool_size);

        let evictable = state
            .page_table
            .values()
            .filter(|&&frame_id| state.meta[frame_id].pin_count == 0)
            .count();
        assert_eq!(state.replacer.size(), evictable);
    }
}

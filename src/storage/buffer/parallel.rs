use super::frame::PageHandle;
use super::instance::BufferPoolManagerInstance;
use crate::storage::disk::DiskManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::storage::wal::LogManager;
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;

/// Buffer pool sharded over independent instances. Page `p` always lives in
/// instance `p % num_instances`; new pages are handed out round-robin.
pub struct ParallelBufferPoolManager {
    instances: Vec<BufferPoolManagerInstance>,
    /// Instance the next `new_page` call starts from
    next_instance: Mutex<usize>,
}

impl ParallelBufferPoolManager {
    /// Build `num_instances` shards of `pool_size` frames each over one disk.
    pub fn new(num_instances: u32, pool_size: usize, disk: Arc<dyn DiskManager>) -> Self {
        Self::build(num_instances, pool_size, disk, None)
    }

    pub fn with_log_manager(
        num_instances: u32,
        pool_size: usize,
        disk: Arc<dyn DiskManager>,
        log_manager: Arc<dyn LogManager>,
    ) -> Self {
        Self::build(num_instances, pool_size, disk, Some(log_manager))
    }

    fn build(
        num_instances: u32,
        pool_size: usize,
        disk: Arc<dyn DiskManager>,
        log_manager: Option<Arc<dyn LogManager>>,
    ) -> Self {
        assert!(num_instances > 0, "a buffer pool needs at least one instance");

        let instances = (0..num_instances)
            .map(|index| {
                let instance = BufferPoolManagerInstance::new_sharded(
                    pool_size,
                    num_instances,
                    index,
                    disk.clone(),
                );
                match &log_manager {
                    Some(log) => instance.with_log_manager(log.clone()),
                    None => instance,
                }
            })
            .collect();

        Self {
            instances,
            next_instance: Mutex::new(0),
        }
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn instance(&self, index: usize) -> Option<&BufferPoolManagerInstance> {
        self.instances.get(index)
    }

    /// Sum of all shard capacities.
    pub fn pool_size(&self) -> usize {
        self.instances.iter().map(|i| i.pool_size()).sum()
    }

    /// Shard responsible for `page_id`.
    fn instance_for(&self, page_id: PageId) -> &BufferPoolManagerInstance {
        &self.instances[page_id.0 as usize % self.instances.len()]
    }

    pub fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle<'_>> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    pub fn flush_page(&self, page_id: PageId) -> StorageResult<bool> {
        self.instance_for(page_id).flush_page(page_id)
    }

    pub fn delete_page(&self, page_id: PageId) -> bool {
        self.instance_for(page_id).delete_page(page_id)
    }

    /// Create a page in the first shard, starting from the rotating cursor,
    /// that has a frame to spare. Each shard is tried at most once.
    pub fn new_page(&self) -> StorageResult<(PageId, PageHandle<'_>)> {
        let num_instances = self.instances.len();
        let start = {
            let mut next = self.next_instance.lock();
            let start = *next;
            *next = (start + 1) % num_instances;
            start
        };

        for offset in 0..num_instances {
            let index = (start + offset) % num_instances;
            match self.instances[index].new_page() {
                Ok((page_id, handle)) => {
                    trace!("instance {} created page {}", index, page_id);
                    return Ok((page_id, handle));
                }
                Err(StorageError::BufferPoolFull) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::BufferPoolFull)
    }

    pub fn flush_all(&self) -> StorageResult<()> {
        for instance in &self.instances {
            instance.flush_all()?;
        }
        Ok(())
    }
}

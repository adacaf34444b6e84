use crate::storage::disk::DiskManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::ParallelBufferPoolManager;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Frames per instance.
    pub pool_size: usize,
    /// Number of shards the page id space is split across.
    pub num_instances: u32,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        BufferPoolConfig {
            pool_size: 64,
            num_instances: 1,
        }
    }
}

impl BufferPoolConfig {
    pub fn total_frames(&self) -> usize {
        self.pool_size * self.num_instances as usize
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.num_instances == 0 {
            return Err(StorageError::InvalidConfig(
                "num_instances must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build(&self, disk: Arc<dyn DiskManager>) -> StorageResult<ParallelBufferPoolManager> {
        self.validate()?;
        Ok(ParallelBufferPoolManager::new(
            self.num_instances,
            self.pool_size,
            disk,
        ))
    }
}

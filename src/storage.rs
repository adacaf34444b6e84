//! Storage layer of pagepool.
//!
//! This module provides the page cache that sits between access methods and
//! the disk. Key components:
//!
//! - **Page**: Fixed-size (4KB) blocks of data, the basic unit of I/O
//! - **DiskManager**: Reads and writes pages by id (file-backed or in-memory)
//! - **Replacer**: Eviction policy over unpinned frames, LRU by default
//! - **BufferPoolManagerInstance**: A bounded set of frames with pinning and write-back
//! - **ParallelBufferPoolManager**: Several instances sharded by page id
//!
//! Write-ahead logging is a collaborator the pool holds but does not drive.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;
pub mod wal;

pub use buffer::{
    BufferPool, BufferPoolManagerInstance, PageReadGuard, PageWriteGuard,
    ParallelBufferPoolManager,
};
pub use disk::{DiskManager, MemoryDiskManager, PageManager};
pub use error::{StorageError, StorageResult};
pub use page::{PageId, PAGE_SIZE};

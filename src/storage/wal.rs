//! Write-ahead log collaborator.
//!
//! Buffer pool instances hold a handle to the log so that a future recovery
//! layer can coordinate page write-back with log flushing. The replacement
//! logic does not consult it: a dirty page may reach disk before the log
//! records describing it. Callers that need WAL ordering must enforce it
//! above the buffer pool.

use crate::storage::error::StorageResult;
use std::fmt;

/// Log sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Lsn(pub u64);

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait LogManager: Send + Sync {
    /// Highest LSN known to be durable.
    fn flushed_lsn(&self) -> Lsn;

    /// Force every buffered record up to and including `lsn` to disk.
    fn flush(&self, lsn: Lsn) -> StorageResult<()>;
}

use crate::storage::disk::DiskManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PAGE_SIZE};
use dashmap::DashSet;
use log::{debug, trace};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// File-backed page store. Page `n` lives at byte offset `n * PAGE_SIZE`.
pub struct PageManager {
    file: Mutex<File>,
    deallocated: DashSet<PageId>,
}

impl PageManager {
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        debug!("created page file {:?}", path);

        Ok(Self::from_file(file))
    }

    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("opened page file {:?}", path);

        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(file),
            deallocated: DashSet::new(),
        }
    }

    pub fn num_pages(&self) -> StorageResult<u32> {
        let file_size = self.file.lock().metadata()?.len();
        Ok((file_size / PAGE_SIZE as u64) as u32)
    }

    /// Whether `page_id` has been handed back through `deallocate_page`.
    pub fn is_deallocated(&self, page_id: PageId) -> bool {
        self.deallocated.contains(&page_id)
    }

    fn check_len(len: usize) -> StorageResult<()> {
        if len != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: len,
            });
        }
        Ok(())
    }
}

impl DiskManager for PageManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        Self::check_len(buf.len())?;

        let offset = page_id.offset();
        let mut file = self.file.lock();
        let file_size = file.metadata()?.len();

        if offset >= file_size {
            trace!("page {} is past end of file, reading zeros", page_id);
            buf.fill(0);
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;

        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        Self::check_len(data.len())?;

        let offset = page_id.offset();
        let mut file = self.file.lock();
        let file_size = file.metadata()?.len();

        // Extend file if necessary
        if offset >= file_size {
            file.set_len(offset + PAGE_SIZE as u64)?;
        }

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.sync_all()?;
        self.deallocated.remove(&page_id);

        Ok(())
    }

    fn allocate_page(&self) -> StorageResult<PageId> {
        let file = self.file.lock();
        let current_pages = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        let new_page_id = PageId(current_pages);

        file.set_len((current_pages as u64 + 1) * PAGE_SIZE as u64)?;

        Ok(new_page_id)
    }

    fn deallocate_page(&self, page_id: PageId) {
        trace!("deallocating page {}", page_id);
        self.deallocated.insert(page_id);
    }
}

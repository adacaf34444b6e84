use anyhow::Result;
use pagepool::config::BufferPoolConfig;
use pagepool::storage::{
    BufferPool, BufferPoolManagerInstance, DiskManager, MemoryDiskManager, PageId, PageManager,
    ParallelBufferPoolManager, StorageError, PAGE_SIZE,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

#[test]
fn test_file_backed_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("pool.db");
    let disk = Arc::new(PageManager::create(&file_path)?);
    let bpm = BufferPoolManagerInstance::new(3, disk.clone());

    let mut written = Vec::new();
    for i in 0..10u8 {
        let (page_id, mut guard) = bpm.new_page_write()?;
        guard.fill(i);
        written.push((page_id, i));
    }

    // Only three frames, so most pages went through eviction
    for (page_id, value) in &written {
        let guard = bpm.fetch_page_read(*page_id)?;
        assert!(guard.iter().all(|b| b == value), "page {} corrupted", page_id);
    }

    bpm.flush_all()?;
    let mut buf = vec![0u8; PAGE_SIZE];
    for (page_id, value) in &written {
        disk.read_page(*page_id, &mut buf)?;
        assert!(buf.iter().all(|b| b == value));
    }

    Ok(())
}

#[test]
fn test_reopen_after_flush() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("pool.db");

    let page_id = {
        let bpm = BufferPoolManagerInstance::new(4, Arc::new(PageManager::create(&file_path)?));
        let (page_id, mut guard) = bpm.new_page_write()?;
        guard[..5].copy_from_slice(b"hello");
        drop(guard);
        assert!(bpm.flush_page(page_id)?);
        page_id
    };

    let bpm = BufferPoolManagerInstance::new(4, Arc::new(PageManager::open(&file_path)?));
    let guard = bpm.fetch_page_read(page_id)?;
    assert_eq!(&guard[..5], b"hello");

    Ok(())
}

#[test]
fn test_sharded_ids_mod_three() -> Result<()> {
    let bpm = ParallelBufferPoolManager::new(3, 5, Arc::new(MemoryDiskManager::new()));

    let mut seen = HashSet::new();
    for _ in 0..60 {
        let (page_id, guard) = bpm.new_page_write()?;
        drop(guard);
        assert!(seen.insert(page_id), "page id {} handed out twice", page_id);
    }

    for index in 0..3 {
        let instance = bpm.instance(index).unwrap();
        for page_id in instance.resident_pages() {
            assert_eq!(page_id.0 as usize % 3, index);
        }
    }

    Ok(())
}

#[test]
fn test_exhaustion_is_a_plain_error() {
    let bpm = ParallelBufferPoolManager::new(2, 2, Arc::new(MemoryDiskManager::new()));

    let mut held = Vec::new();
    for _ in 0..4 {
        held.push(bpm.new_page_write().unwrap());
    }
    assert!(matches!(bpm.new_page(), Err(StorageError::BufferPoolFull)));
    assert!(matches!(
        bpm.fetch_page(PageId(100)),
        Err(StorageError::BufferPoolFull)
    ));

    held.pop();
    assert!(bpm.new_page_write().is_ok());
}

#[test]
fn test_concurrent_writers() -> Result<()> {
    let config = BufferPoolConfig {
        pool_size: 8,
        num_instances: 4,
    };
    let disk = Arc::new(MemoryDiskManager::new());
    let bpm = Arc::new(config.build(disk)?);

    let mut handles = Vec::new();
    for t in 0..8u8 {
        let bpm = bpm.clone();
        handles.push(thread::spawn(move || -> Result<Vec<PageId>> {
            let mut mine = Vec::new();
            for _ in 0..25 {
                // A full pool is expected under contention; retry until a frame frees up
                let (page_id, mut guard) = loop {
                    match bpm.new_page_write() {
                        Ok(created) => break created,
                        Err(StorageError::BufferPoolFull) => thread::yield_now(),
                        Err(e) => return Err(e.into()),
                    }
                };
                guard.fill(t);
                mine.push(page_id);
            }

            for &page_id in &mine {
                let guard = loop {
                    match bpm.fetch_page_read(page_id) {
                        Ok(guard) => break guard,
                        Err(StorageError::BufferPoolFull) => thread::yield_now(),
                        Err(e) => return Err(e.into()),
                    }
                };
                assert!(guard.iter().all(|&b| b == t));
            }
            Ok(mine)
        }));
    }

    let mut all = HashSet::new();
    for handle in handles {
        let pages = handle.join().expect("writer thread panicked")?;
        for page_id in pages {
            assert!(all.insert(page_id));
        }
    }
    assert_eq!(all.len(), 200);

    for index in 0..4 {
        let instance = bpm.instance(index).unwrap();
        assert_eq!(instance.replacer_size() + instance.free_frame_count(), 8);
    }

    Ok(())
}

#[test]
fn test_concurrent_fetch_of_shared_pages() -> Result<()> {
    let bpm = Arc::new(BufferPoolManagerInstance::new(
        4,
        Arc::new(MemoryDiskManager::new()),
    ));

    let mut pages = Vec::new();
    for i in 0..16u8 {
        let (page_id, mut guard) = bpm.new_page_write()?;
        guard[0] = i;
        pages.push(page_id);
    }
    let pages = Arc::new(pages);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bpm = bpm.clone();
            let pages = pages.clone();
            thread::spawn(move || {
                for round in 0..50 {
                    for (i, &page_id) in pages.iter().enumerate().skip(round % 3) {
                        match bpm.fetch_page_read(page_id) {
                            Ok(guard) => assert_eq!(guard[0], i as u8),
                            Err(StorageError::BufferPoolFull) => thread::yield_now(),
                            Err(e) => panic!("fetch failed: {}", e),
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("reader thread panicked");
    }

    for &page_id in pages.iter() {
        assert_eq!(bpm.pin_count(page_id).unwrap_or(0), 0);
    }

    Ok(())
}

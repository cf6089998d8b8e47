use anyhow::Error;

use crate::chunk_stat::ChunkStat;
use crate::chunk_store::{ChunkStore, LocalChunkStore};
use crate::lru::LRUClassifier;

/// Result of walking the chunk store once (§4.2 of the component design).
pub struct ChunkWalkResult {
    pub lru: LRUClassifier,
    pub chunk_count: u64,
    pub chunk_dir_count: u64,
}

/// Enumerate every chunk, classifying each as `live` or `dead` by LRU under
/// `live_size_max`. A malformed chunk file name aborts the walk (pass-fatal); a
/// chunk that fails to read is folded into `dead` without aborting.
pub fn walk_chunks(store: &LocalChunkStore, live_size_max: u64) -> Result<ChunkWalkResult, Error> {
    let mut lru = LRUClassifier::new(live_size_max);
    let mut chunk_count = 0u64;

    let mut iter = store.walk()?;
    for entry in &mut iter {
        let (id, size, mtime) = entry?;
        chunk_count += 1;
        match store.get_chunk(&id) {
            Ok(_) => lru.offer(ChunkStat { id, size, mtime }),
            Err(err) => {
                log::warn!("chunk {id} unreadable during walk, marking dead: {err}");
                lru.mark_dead(id, size);
            }
        }
    }

    Ok(ChunkWalkResult {
        lru,
        chunk_count,
        chunk_dir_count: iter.dir_count,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_blob::DataChunkBuilder;
    use crate::ChunkId;
    use std::fs;
    use std::path::{Path, PathBuf};

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!(
                "bincache-chunk-walk-test-{}-{:?}",
                std::process::id(),
                std::thread::current().id()
            ));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).unwrap();
            TempDir(path)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn make_store() -> (TempDir, LocalChunkStore) {
        let dir = TempDir::new();
        let store = LocalChunkStore::open(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    fn insert(store: &LocalChunkStore, data: &[u8]) -> ChunkId {
        let (blob, digest) = DataChunkBuilder::new(data).build().unwrap();
        let id = ChunkId::from_digest(digest);
        let path = store.chunk_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, blob.raw_data()).unwrap();
        id
    }

    #[test]
    fn classifies_all_chunks_as_live_under_budget() {
        let (_dir, store) = make_store();
        insert(&store, b"one");
        insert(&store, b"two");

        let result = walk_chunks(&store, 1_000_000).unwrap();
        assert_eq!(result.chunk_count, 2);
        assert_eq!(result.lru.dead_count(), 0);
    }

    #[test]
    fn unreadable_chunk_is_marked_dead() {
        let (_dir, store) = make_store();
        let id = insert(&store, b"data");
        // truncate the blob so CRC verification fails
        let path = store.chunk_path(&id);
        fs::write(&path, b"corrupt").unwrap();

        let result = walk_chunks(&store, 1_000_000).unwrap();
        assert_eq!(result.chunk_count, 1);
        assert!(result.lru.is_dead(&id));
    }
}

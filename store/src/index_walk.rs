use std::time::{Duration, SystemTime};

use anyhow::Error;
use walkdir::WalkDir;

use crate::dead_set::DeadIndexSet;
use crate::index::{ArtifactKind, IndexEntry};
use crate::index_store::IndexStore;
use crate::integrity::IntegrityPool;
use crate::lru::LRUClassifier;

/// Files with an unrecognised extension younger than this are left alone; they
/// may be an in-progress write in a format the GC doesn't understand yet.
const IGNORE_BEFORE: Duration = Duration::from_secs(10 * 60);

pub struct IndexWalkResult {
    pub index_count: u64,
    pub inflated_size: u64,
}

/// Walk every file under the index store, classifying `.nar`/`.narinfo` files and
/// feeding them to the integrity pool and the referential check (§4.3).
pub fn walk_indices(
    index_store: &dyn IndexStore,
    lru: &LRUClassifier,
    pool: &IntegrityPool,
    dead_set: &DeadIndexSet,
) -> Result<IndexWalkResult, Error> {
    let base = index_store.base_path().to_path_buf();
    let now = SystemTime::now();

    let mut index_count = 0u64;
    let mut inflated_size = 0u64;

    for entry in WalkDir::new(&base).into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::NotFound) {
                    continue;
                }
                return Err(anyhow::format_err!("index walk failed: {err}"));
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let kind = match ArtifactKind::from_extension(path) {
            Some(kind) => kind,
            None => {
                let mtime = entry.metadata()?.modified()?;
                let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
                if age < IGNORE_BEFORE {
                    continue; // too fresh, might be an in-flight unknown-format write
                }
                // older unknown-format file: examined for future cleanup, but this
                // pass has no defined action for it beyond leaving it alone.
                continue;
            }
        };

        let relative = path
            .strip_prefix(&base)
            .map_err(|err| anyhow::format_err!("index path {path:?} not under {base:?}: {err}"))?;

        let index = index_store
            .get_index(relative)
            .map_err(|err| anyhow::format_err!("failed to load index {path:?}: {err}"))?;

        inflated_size += index.inflated_size();
        index_count += 1;

        pool.submit(IndexEntry {
            path: path.to_path_buf(),
            kind,
            index: index.clone(),
        });

        if index.is_empty() {
            dead_set.mark(path.to_path_buf());
            continue;
        }

        for chunk in index.chunks() {
            if lru.is_dead(&chunk.id) {
                dead_set.mark(path.to_path_buf());
                break;
            }
        }
    }

    Ok(IndexWalkResult {
        index_count,
        inflated_size,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunk_store::LocalChunkStore;
    use crate::index::{Index, IndexChunk};
    use crate::index_store::LocalIndexStore;
    use crate::integrity::IntegrityPool;
    use crate::ChunkId;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(label: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!(
                "bincache-index-walk-{label}-{}-{:?}",
                std::process::id(),
                std::thread::current().id()
            ));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).unwrap();
            TempDir(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn empty_index_is_marked_dead() {
        let index_dir = TempDir::new("idx");
        let chunk_dir = TempDir::new("chunk");

        let index_store = LocalIndexStore::open(index_dir.0.clone()).unwrap();
        let chunk_store: Arc<dyn crate::chunk_store::ChunkStore> =
            Arc::new(LocalChunkStore::open(chunk_dir.0.clone()).unwrap());

        let empty = Index::default();
        fs::write(
            index_dir.0.join("b.narinfo"),
            serde_json::to_vec(&empty).unwrap(),
        )
        .unwrap();

        let lru = LRUClassifier::new(u64::MAX);
        let dead_set = Arc::new(DeadIndexSet::new());
        let pool = IntegrityPool::spawn(chunk_store, Arc::clone(&dead_set));

        let result = walk_indices(&index_store, &lru, &pool, &dead_set).unwrap();
        pool.join();

        assert_eq!(result.index_count, 1);
        assert!(dead_set.contains(&index_dir.0.join("b.narinfo")));
    }

    #[test]
    fn index_referencing_dead_chunk_is_marked() {
        let index_dir = TempDir::new("idx2");
        let chunk_dir = TempDir::new("chunk2");

        let index_store = LocalIndexStore::open(index_dir.0.clone()).unwrap();
        let chunk_store: Arc<dyn crate::chunk_store::ChunkStore> =
            Arc::new(LocalChunkStore::open(chunk_dir.0.clone()).unwrap());

        let dead_chunk = ChunkId::from_digest([1; 32]);
        let index = Index::new(vec![IndexChunk {
            id: dead_chunk,
            length: 10,
            offset: 0,
        }]);
        fs::write(index_dir.0.join("a.nar"), serde_json::to_vec(&index).unwrap()).unwrap();

        let mut lru = LRUClassifier::new(0);
        lru.mark_dead(dead_chunk, 10);

        let dead_set = Arc::new(DeadIndexSet::new());
        let pool = IntegrityPool::spawn(chunk_store, Arc::clone(&dead_set));

        let result = walk_indices(&index_store, &lru, &pool, &dead_set).unwrap();
        pool.join();

        assert_eq!(result.index_count, 1);
        assert!(dead_set.contains(&index_dir.0.join("a.nar")));
    }
}

use std::time::SystemTime;

use crate::ChunkId;

/// A single chunk as observed during a chunk-store walk.
///
/// Produced by [`crate::chunk_store::ChunkStore::walk`] for every regular file found
/// under the store's fanout directories; consumed by the LRU classifier to decide
/// which chunks survive a GC pass.
#[derive(Debug, Clone, Copy)]
pub struct ChunkStat {
    pub id: ChunkId,
    pub size: u64,
    pub mtime: SystemTime,
}

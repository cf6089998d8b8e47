use std::sync::Arc;
use std::time::Instant;

use anyhow::Error;

use bincache_api_types::GcStatus;

use crate::chunk_store::{ChunkStore, LocalChunkStore};
use crate::chunk_walk::walk_chunks;
use crate::dead_set::DeadIndexSet;
use crate::index_store::IndexStore;
use crate::index_walk::walk_indices;
use crate::integrity::IntegrityPool;

/// Drive one full GC pass (§4.5): chunk walk, index walk (with integrity workers
/// running alongside), then deletion of dead indices followed by dead chunks.
///
/// On a walk error the pass aborts and deletes nothing; the returned `GcStatus`
/// still has `gc_time_local` populated so the time-spent counter stays accurate
/// even for aborted passes.
pub fn run_gc_pass(
    chunk_store: Arc<LocalChunkStore>,
    index_store: &dyn IndexStore,
    live_size_max: u64,
) -> (GcStatus, Result<(), Error>) {
    let start = Instant::now();
    let result = run_gc_pass_inner(chunk_store, index_store, live_size_max);

    let mut status = match &result {
        Ok(status) => status.clone(),
        Err(_) => GcStatus::default(),
    };
    status.gc_time_local = start.elapsed().as_millis() as u64;

    let outcome = result.map(|_| ());
    (status, outcome)
}

fn run_gc_pass_inner(
    chunk_store: Arc<LocalChunkStore>,
    index_store: &dyn IndexStore,
    live_size_max: u64,
) -> Result<GcStatus, Error> {
    let chunk_walk_start = Instant::now();
    let chunk_result = walk_chunks(&chunk_store, live_size_max)?;
    let chunk_walk_local = chunk_walk_start.elapsed().as_millis() as u64;

    let dead_set = Arc::new(DeadIndexSet::new());
    let chunk_store_dyn: Arc<dyn ChunkStore> = chunk_store.clone();
    let pool = IntegrityPool::spawn(chunk_store_dyn, Arc::clone(&dead_set));

    let index_walk_start = Instant::now();
    let index_result = walk_indices(index_store, &chunk_result.lru, &pool, &dead_set);
    pool.join();
    let index_result = index_result?;
    let index_walk_local = index_walk_start.elapsed().as_millis() as u64;

    // Deletion order matters: indices first, then chunks (see component design).
    let mut index_gc_count_local = 0u64;
    for path in dead_set.drain_paths() {
        match std::fs::remove_file(&path) {
            Ok(()) => index_gc_count_local += 1,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("failed to remove dead index {path:?}: {err}"),
        }
    }

    let mut chunk_gc_count_local = 0u64;
    let mut chunk_gc_bytes_local = 0u64;
    for id in chunk_result.lru.dead() {
        match chunk_store.remove_chunk(id) {
            Ok(()) => chunk_gc_count_local += 1,
            Err(err) => log::warn!("failed to remove dead chunk {id}: {err}"),
        }
    }
    chunk_gc_bytes_local += chunk_result.lru.dead_size();

    Ok(GcStatus {
        chunk_count_local: chunk_result.lru.live_count() as u64 + chunk_result.lru.dead_count() as u64,
        chunk_size_local: chunk_result.lru.live_size(),
        chunk_dir_count: chunk_result.chunk_dir_count,
        chunk_gc_count_local,
        chunk_gc_bytes_local,
        chunk_walk_local,
        index_count_local: index_result.index_count,
        inflated_size_local: index_result.inflated_size,
        index_gc_count_local,
        index_walk_local,
        max_size_local: live_size_max,
        gc_time_local: 0, // filled in by the caller, which also times the error path
    })
}

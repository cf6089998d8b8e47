use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Error};

use bincache_api_types::VerifyStatus;
use bincache_tools::parallel_handler::ParallelHandler;

use crate::chunk_store::{ChunkStore, LocalChunkStore};
use crate::ChunkId;

/// Full chunk store self-check, backing [`ChunkStore::verify`].
///
/// Walks every chunk, verifying its on-disk blob against its CRC and its content
/// against its own id. Corrupt chunks are logged; with `repair` set they are
/// removed outright rather than left to poison a later GC pass. Verification work
/// is fanned out to `parallelism` worker threads via the same channel-based pool
/// the integrity workers use.
///
/// A corrupt chunk does not stop the walk: the handler records the failure and
/// returns `Ok`, so the pool keeps consuming the rest of the store instead of
/// tripping its shared abort latch and leaving later chunks unrepaired until the
/// next tick. The accumulated failure count is turned into an aggregate error
/// once the whole store has been walked.
pub fn verify_store(
    store: &LocalChunkStore,
    parallelism: usize,
    repair: bool,
    progress_sink: &mut dyn FnMut(u8),
) -> Result<(), Error> {
    let parallelism = parallelism.max(1);

    let worker_store = store.clone();
    let failures = Arc::new(AtomicU64::new(0));
    let worker_failures = Arc::clone(&failures);
    let pool = ParallelHandler::new("chunk-verify", parallelism, move |id: ChunkId| {
        let store = &worker_store;
        if let Err(err) = store.get_chunk(&id) {
            log::warn!("chunk {id} failed verification: {err}");
            worker_failures.fetch_add(1, Ordering::Relaxed);
            if repair {
                if let Err(err) = store.remove_chunk(&id) {
                    log::warn!("failed to remove corrupt chunk {id}: {err}");
                }
            }
        }
        Ok(())
    });

    let mut total = 0u64;
    let mut last_percentage = 0u64;

    for entry in store.walk()? {
        let (id, _size, _mtime) = entry?;
        total += 1;
        pool.send(id)?;

        let percentage = (total.saturating_sub(1) * 100) / total.max(1);
        if percentage != last_percentage {
            progress_sink(percentage as u8);
            last_percentage = percentage;
        }
    }

    pool.complete()?;
    progress_sink(100);

    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        bail!("{failed} chunk(s) failed verification");
    }

    Ok(())
}

/// One verifier tick (§4.6): run a full self-check with CPU-parallel workers and
/// repair enabled. Never propagates an error to the caller — failures are folded
/// into `VerifyStatus::ok` and logged here.
pub fn run_verifier_tick(store: &dyn ChunkStore) -> VerifyStatus {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let start = Instant::now();
    let result = store.verify(parallelism, true, &mut |_percentage| {});
    let verify_time_local = start.elapsed().as_millis() as u64;

    let ok = match result {
        Ok(()) => true,
        Err(err) => {
            log::error!("verifier pass failed: {err:#}");
            false
        }
    };

    VerifyStatus {
        verify_time_local,
        ok,
    }
}

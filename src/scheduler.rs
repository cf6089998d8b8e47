//! Drives the two independent maintenance loops (§4.7): garbage collection and
//! verification. Each loop runs an immediate pass at startup, then one pass per
//! tick of its own interval; passes of the same kind never overlap because the
//! loop body is synchronous.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bincache_api_types::{GcStatus, VerifyStatus};
use bincache_store::{IndexStore, LocalChunkStore};

use crate::metrics;

/// Spawn the GC loop. Returns the thread handle and a handle to the running
/// cumulative status (gauges reflect the latest pass, counters accumulate).
pub fn spawn_gc_loop(
    chunk_store: Arc<LocalChunkStore>,
    index_store: Arc<dyn IndexStore>,
    live_size_max: u64,
    interval: Duration,
) -> (JoinHandle<()>, Arc<Mutex<GcStatus>>) {
    let status = Arc::new(Mutex::new(GcStatus::default()));
    let status_clone = Arc::clone(&status);

    let handle = std::thread::spawn(move || loop {
        let (pass_status, result) =
            bincache_store::gc::run_gc_pass(Arc::clone(&chunk_store), index_store.as_ref(), live_size_max);

        match &result {
            Ok(()) => log::info!(
                "gc pass complete: {} chunks live ({} bytes), {} indices live, {} chunks removed, {} indices removed",
                pass_status.chunk_count_local,
                pass_status.chunk_size_local,
                pass_status.index_count_local,
                pass_status.chunk_gc_count_local,
                pass_status.index_gc_count_local,
            ),
            Err(err) => log::error!("gc pass aborted: {err}"),
        }

        metrics::record_gc(&pass_status);
        status_clone.lock().unwrap().accumulate(&pass_status);

        std::thread::sleep(interval);
    });

    (handle, status)
}

/// Spawn the verifier loop.
pub fn spawn_verify_loop(
    chunk_store: Arc<LocalChunkStore>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<Mutex<VerifyStatus>>) {
    let status = Arc::new(Mutex::new(VerifyStatus::default()));
    let status_clone = Arc::clone(&status);

    let handle = std::thread::spawn(move || loop {
        let tick_status = bincache_store::verify::run_verifier_tick(chunk_store.as_ref());

        if tick_status.ok {
            log::info!("verifier pass complete, store healthy");
        } else {
            log::warn!("verifier pass found integrity issues");
        }

        metrics::record_verify(&tick_status);
        *status_clone.lock().unwrap() = tick_status;

        std::thread::sleep(interval);
    });

    (handle, status)
}

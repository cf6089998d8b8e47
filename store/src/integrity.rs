use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::chunk_store::ChunkStore;
use crate::dead_set::DeadIndexSet;
use crate::index::{ArtifactKind, IndexEntry};
use crate::{nar, narinfo};

/// Fixed pool size from the component design: three workers, one second idle
/// timeout per worker.
const WORKER_COUNT: usize = 3;
const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// A running pool of integrity workers plus the channel used to feed it.
///
/// Submissions are handed off over an unbuffered (rendezvous) channel. Each worker
/// blocks on receive with a one-second idle timeout, so closing the channel (by
/// dropping the returned sender) lets idle workers exit immediately, while a
/// producer that stalls mid-walk is bounded to a one-second-per-worker join cost.
pub struct IntegrityPool {
    sender: Option<Sender<IndexEntry>>,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl IntegrityPool {
    pub fn spawn(store: Arc<dyn ChunkStore>, dead_set: Arc<DeadIndexSet>) -> Self {
        let (tx, rx) = bounded::<IndexEntry>(0);

        let handles = (0..WORKER_COUNT)
            .map(|i| {
                let rx: Receiver<IndexEntry> = rx.clone();
                let store = Arc::clone(&store);
                let dead_set = Arc::clone(&dead_set);
                std::thread::Builder::new()
                    .name(format!("integrity-worker-{i}"))
                    .spawn(move || loop {
                        match rx.recv_timeout(IDLE_TIMEOUT) {
                            Ok(entry) => check_entry(&*store, &dead_set, entry),
                            Err(_) => return, // idle timeout, or channel closed
                        }
                    })
                    .expect("failed to spawn integrity worker")
            })
            .collect();

        IntegrityPool {
            sender: Some(tx),
            handles,
        }
    }

    pub fn submit(&self, entry: IndexEntry) {
        if let Some(sender) = &self.sender {
            // A full rendezvous channel never holds more than one in-flight item;
            // a send error just means all workers have already exited.
            let _ = sender.send(entry);
        }
    }

    /// Close the channel and wait for all workers to finish.
    pub fn join(mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn check_entry(store: &dyn ChunkStore, dead_set: &DeadIndexSet, entry: IndexEntry) {
    let IndexEntry { path, kind, index } = entry;

    let mut data = Vec::with_capacity(index.inflated_size() as usize);
    for chunk in index.chunks() {
        match store.get_chunk(&chunk.id) {
            Ok(bytes) => data.extend_from_slice(&bytes),
            Err(err) => {
                log::warn!("{path:?}: unable to assemble chunk {} - {err}", chunk.id);
                dead_set.mark(path);
                return;
            }
        }
    }

    let result = match kind {
        ArtifactKind::Nar => nar::parse(&data).map(|archive| !archive.is_empty()),
        ArtifactKind::Narinfo => narinfo::parse(&data).map(|_| true),
    };

    match result {
        Ok(true) => (),
        Ok(false) => {
            log::warn!("{path:?}: archive contains zero entries");
            dead_set.mark(path);
        }
        Err(err) => {
            log::warn!("{path:?}: integrity check failed - {err}");
            dead_set.mark(path);
        }
    }
}

use serde::{Deserialize, Serialize};

/// Result of one GC pass.
///
/// Field names intentionally match the `*_local` metric names from the maintenance
/// subsystem's external interface: gauge-kind fields are overwritten every pass,
/// counter-kind fields are added to across passes (see [`GcStatus::accumulate`]).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GcStatus {
    /// Number of chunks found live on disk (gauge).
    pub chunk_count_local: u64,
    /// Sum of live chunk sizes in bytes (gauge).
    pub chunk_size_local: u64,
    /// Number of populated chunk subdirectories walked (gauge).
    pub chunk_dir_count: u64,
    /// Chunks removed this pass (counter).
    pub chunk_gc_count_local: u64,
    /// Bytes removed via chunk deletion this pass (counter).
    pub chunk_gc_bytes_local: u64,
    /// Milliseconds spent walking the chunk store this pass (counter).
    pub chunk_walk_local: u64,

    /// Number of indices found live (gauge).
    pub index_count_local: u64,
    /// Sum of the inflated (pre-chunking) size of all indices (gauge).
    pub inflated_size_local: u64,
    /// Indices removed this pass (counter).
    pub index_gc_count_local: u64,
    /// Milliseconds spent walking the index store this pass (counter).
    pub index_walk_local: u64,

    /// Effective live-chunk byte budget for this pass (gauge).
    pub max_size_local: u64,
    /// Milliseconds spent on the whole pass, including any abort (counter).
    pub gc_time_local: u64,
}

impl GcStatus {
    /// Merge the counters of a just-finished pass into the running totals.
    ///
    /// Gauge fields are overwritten with the latest pass's values; counter fields
    /// are added. `gc_time_local` is added unconditionally, even for aborted passes.
    pub fn accumulate(&mut self, pass: &GcStatus) {
        self.chunk_count_local = pass.chunk_count_local;
        self.chunk_size_local = pass.chunk_size_local;
        self.chunk_dir_count = pass.chunk_dir_count;
        self.index_count_local = pass.index_count_local;
        self.inflated_size_local = pass.inflated_size_local;
        self.max_size_local = pass.max_size_local;

        self.chunk_gc_count_local += pass.chunk_gc_count_local;
        self.chunk_gc_bytes_local += pass.chunk_gc_bytes_local;
        self.chunk_walk_local += pass.chunk_walk_local;
        self.index_gc_count_local += pass.index_gc_count_local;
        self.index_walk_local += pass.index_walk_local;
        self.gc_time_local += pass.gc_time_local;
    }
}

/// Result of one verifier tick.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VerifyStatus {
    /// Milliseconds spent in the store's self-check this tick (counter).
    pub verify_time_local: u64,
    /// Whether the store reported the run as fully healthy.
    pub ok: bool,
}

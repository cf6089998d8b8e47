//! Publishes the per-pass status structs from `bincache-store` as named metrics
//! (see the maintenance subsystem's external-interface table), using the `metrics`
//! facade crate with a Prometheus exporter backend.

use anyhow::Error;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use bincache_api_types::{GcStatus, VerifyStatus};

/// Install the Prometheus recorder and start its HTTP listener.
pub fn install(listen: std::net::SocketAddr) -> Result<(), Error> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .map_err(|err| anyhow::format_err!("failed to install metrics exporter: {err}"))
}

/// Record one GC pass. Gauges are overwritten, counters are incremented by the
/// pass's own delta (the `metrics` crate backend accumulates counters itself).
pub fn record_gc(status: &GcStatus) {
    gauge!("chunk_count_local").set(status.chunk_count_local as f64);
    gauge!("chunk_size_local").set(status.chunk_size_local as f64);
    gauge!("chunk_dir_count").set(status.chunk_dir_count as f64);
    gauge!("index_count_local").set(status.index_count_local as f64);
    gauge!("inflated_size_local").set(status.inflated_size_local as f64);
    gauge!("max_size_local").set(status.max_size_local as f64);

    counter!("chunk_gc_count_local").increment(status.chunk_gc_count_local);
    counter!("chunk_gc_bytes_local").increment(status.chunk_gc_bytes_local);
    counter!("chunk_walk_local").increment(status.chunk_walk_local);
    counter!("index_gc_count_local").increment(status.index_gc_count_local);
    counter!("index_walk_local").increment(status.index_walk_local);
    counter!("gc_time_local").increment(status.gc_time_local);
}

/// Record one verifier tick.
pub fn record_verify(status: &VerifyStatus) {
    counter!("verify_time_local").increment(status.verify_time_local);
}

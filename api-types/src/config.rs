use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes reserved for the `.chunks/xxxx/` directory fanout, subtracted from the
/// configured cache size to get the effective live-chunk budget (see `liveSizeMax`).
///
/// 0xFFFF subdirectories, one filesystem block (4096 bytes) reserved each.
pub const DIR_RESERVE_BYTES: u64 = 0xFFFF * 4096;

/// Maintenance subsystem configuration, as recognised options (§6 of the design).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MaintenanceConfig {
    /// Total byte budget for the chunk store, in GiB.
    pub cache_size_gib: u64,
    /// Duration between GC passes, systemd.time(7) syntax (e.g. "6h").
    pub gc_interval: String,
    /// Duration between verifier runs, systemd.time(7) syntax (e.g. "24h").
    pub verify_interval: String,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        MaintenanceConfig {
            cache_size_gib: 100,
            gc_interval: "6h".to_string(),
            verify_interval: "24h".to_string(),
        }
    }
}

impl MaintenanceConfig {
    /// Effective byte budget for live chunks: `CacheSizeGiB * 2^30 - DirReserve`.
    pub fn live_size_max(&self) -> u64 {
        (self.cache_size_gib * (1 << 30)).saturating_sub(DIR_RESERVE_BYTES)
    }

    pub fn gc_interval(&self) -> Result<Duration, anyhow::Error> {
        bincache_time_span::parse_duration(&self.gc_interval)
    }

    pub fn verify_interval(&self) -> Result<Duration, anyhow::Error> {
        bincache_time_span::parse_duration(&self.verify_interval)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn live_size_max_subtracts_reserve() {
        let cfg = MaintenanceConfig {
            cache_size_gib: 1,
            ..Default::default()
        };
        assert_eq!(cfg.live_size_max(), (1u64 << 30) - DIR_RESERVE_BYTES);
    }
}

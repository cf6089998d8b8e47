use std::path::Path;

use anyhow::{format_err, Error};

use bincache_api_types::MaintenanceConfig;

/// Load the maintenance configuration from `path`.
///
/// A missing file is not an error: the daemon falls back to
/// [`MaintenanceConfig::default`], matching proxmox-style "no config = stock settings".
pub fn load(path: &Path) -> Result<MaintenanceConfig, Error> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("no configuration file at {path:?}, using defaults");
            return Ok(MaintenanceConfig::default());
        }
        Err(err) => return Err(format_err!("unable to read {path:?}: {err}")),
    };

    serde_json::from_str(&raw).map_err(|err| format_err!("unable to parse {path:?}: {err}"))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/nonexistent/bincache-test-config.json")).unwrap();
        assert_eq!(config.cache_size_gib, MaintenanceConfig::default().cache_size_gib);
    }

    #[test]
    fn parses_well_formed_config() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "bincache-config-test-{}-{:?}.json",
            std::process::id(),
            std::thread::current().id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"cache-size-gib": 42, "gc-interval": "1h", "verify-interval": "12h"}}"#
        )
        .unwrap();

        let config = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.cache_size_gib, 42);
        assert_eq!(config.gc_interval, "1h");
    }
}

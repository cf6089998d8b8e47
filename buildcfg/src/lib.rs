//! Exports configuration data from the build system

pub const PKG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
);
pub const PKG_RELEASE: &str = env!("CARGO_PKG_VERSION_PATCH");
pub const PKG_REPOID: &str = env!("REPOID");

/// Unix system user the maintenance daemon runs as.
pub const CACHE_USER_NAME: &str = "bincache";
/// Unix system group the maintenance daemon runs as.
pub const CACHE_GROUP_NAME: &str = "bincache";

#[macro_export]
macro_rules! RUN_DIR_M {
    () => {
        "/run/bincache"
    };
}

#[macro_export]
macro_rules! STATE_DIR_M {
    () => {
        "/var/lib/bincache"
    };
}

#[macro_export]
macro_rules! LOG_DIR_M {
    () => {
        "/var/log/bincache"
    };
}

/// namespaced directory for in-memory (tmpfs) run state
pub const RUN_DIR: &str = RUN_DIR_M!();

/// namespaced directory for persistent state
pub const STATE_DIR: &str = STATE_DIR_M!();

/// namespaced directory for persistent logging
pub const LOG_DIR: &str = LOG_DIR_M!();

/// the PID filename for the maintenance daemon
pub const DAEMON_PID_FN: &str = concat!(RUN_DIR_M!(), "/bincache-maintenanced.pid");

/// default location of the chunk store
pub const CHUNK_STORE_DIR: &str = concat!(STATE_DIR_M!(), "/chunks");

/// default location of the index store
pub const INDEX_STORE_DIR: &str = concat!(STATE_DIR_M!(), "/indices");

/// Prepend the configuration directory to a file name.
///
/// #### Example:
/// ```
/// use bincache_buildcfg::configdir;
/// let config_path = configdir!("/maintenance.toml");
/// ```
#[macro_export]
macro_rules! configdir {
    ($subdir:expr) => {
        concat!("/etc/bincache", $subdir)
    };
}

/// Prepend the run directory to a file name.
#[macro_export]
macro_rules! rundir {
    ($subdir:expr) => {
        concat!($crate::RUN_DIR_M!(), $subdir)
    };
}

/// default location of the maintenance daemon's configuration file
pub const CONFIG_FN: &str = configdir!("/maintenance.json");

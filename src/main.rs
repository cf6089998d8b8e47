mod config;
mod metrics;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error;

use bincache_store::{IndexStore, LocalChunkStore, LocalIndexStore};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!(
        "starting {} release {} ({})",
        bincache_buildcfg::PKG_VERSION,
        bincache_buildcfg::PKG_RELEASE,
        bincache_buildcfg::PKG_REPOID,
    );

    let config = config::load(std::path::Path::new(bincache_buildcfg::CONFIG_FN))?;
    let live_size_max = config.live_size_max();
    let gc_interval = config.gc_interval()?;
    let verify_interval = config.verify_interval()?;

    std::fs::create_dir_all(bincache_buildcfg::CHUNK_STORE_DIR)?;
    std::fs::create_dir_all(bincache_buildcfg::INDEX_STORE_DIR)?;

    let chunk_store = Arc::new(LocalChunkStore::open(PathBuf::from(
        bincache_buildcfg::CHUNK_STORE_DIR,
    ))?);
    let index_store: Arc<dyn IndexStore> = Arc::new(LocalIndexStore::open(PathBuf::from(
        bincache_buildcfg::INDEX_STORE_DIR,
    ))?);

    metrics::install(([0, 0, 0, 0], 9101).into())?;

    log::info!(
        "live size budget: {} bytes, gc every {:?}, verify every {:?}",
        live_size_max,
        gc_interval,
        verify_interval,
    );

    let (gc_handle, _gc_status) =
        scheduler::spawn_gc_loop(Arc::clone(&chunk_store), index_store, live_size_max, gc_interval);
    let (verify_handle, _verify_status) =
        scheduler::spawn_verify_loop(chunk_store, verify_interval);

    gc_handle.join().expect("gc loop panicked");
    verify_handle.join().expect("verify loop panicked");

    Ok(())
}

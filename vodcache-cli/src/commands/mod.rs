//! CLI command implementations.

pub mod config;
pub mod download;
pub mod objects;
pub mod queue;
pub mod serve;

use std::sync::Arc;
use std::time::Duration;

use vodcache::{ConfigFile, DiskStore, Downloader, HttpFetcher};

use crate::error::CliError;

/// Open the configured disk store.
pub fn open_store(config: &ConfigFile) -> Result<Arc<DiskStore>, CliError> {
    Ok(Arc::new(DiskStore::open(&config.store_directory)?))
}

/// Build a downloader against the configured store and timeout.
pub fn build_downloader(config: &ConfigFile) -> Result<(Downloader, Arc<DiskStore>), CliError> {
    let store = open_store(config)?;
    let fetcher = Arc::new(HttpFetcher::with_connect_timeout(Duration::from_secs(
        config.download_timeout_secs,
    ))?);
    Ok((Downloader::new(store.clone(), fetcher), store))
}

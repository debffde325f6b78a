//! CLI error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] vodcache::StoreError),

    #[error(transparent)]
    Download(#[from] vodcache::DownloadError),

    #[error(transparent)]
    Fetch(#[from] vodcache::FetchError),

    #[error(transparent)]
    Serve(#[from] vodcache::server::ServeError),

    #[error(transparent)]
    Config(#[from] vodcache::ConfigError),

    #[error("failed to read queue file {path}: {reason}")]
    QueueFile { path: String, reason: String },
}

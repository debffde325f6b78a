//! Chunked download and range-serving engine for offline video.
//!
//! vodcache downloads large media files from an origin server, persists them
//! as fixed-size chunks, and serves them back over HTTP with byte-range
//! semantics so an ordinary video player can seek through a locally stored
//! file the same way it would against a remote CDN.
//!
//! # Architecture
//!
//! ```text
//! origin ──► Downloader ──► ChunkStore ◄── RangeResolver ◄── HTTP server
//!                 ▲            (disk or memory)
//!                 │
//!          QueueOrchestrator
//! ```
//!
//! * [`store`] — chunk and metadata persistence behind the [`ChunkStore`]
//!   trait, with disk and in-memory implementations.
//! * [`downloader`] — streaming ingestion that slices a remote body into
//!   [`CHUNK_SIZE`] chunks with progress reporting.
//! * [`queue`] — sequential multi-object downloads with per-object
//!   single-flight protection.
//! * [`range`] — byte-range resolution over stored chunks, hole-tolerant.
//! * [`server`] — the axum endpoint speaking the range wire contract.
//! * [`playback`] — local-vs-remote playback source selection.

pub mod config;
pub mod downloader;
pub mod playback;
pub mod queue;
pub mod range;
pub mod server;
pub mod store;
pub mod telemetry;

pub use config::{ConfigFile, ConfigError};
pub use downloader::{
    DownloadError, Downloader, FetchError, FetchedBody, Fetcher, HttpFetcher, ProgressCallback,
};
pub use playback::PlaybackSource;
pub use queue::{QueueItem, QueueOrchestrator, QueueReport};
pub use range::{RangeOutcome, RangeResolver, MAX_RANGE_WINDOW};
pub use store::{ChunkStore, DiskStore, MemoryStore, ObjectMeta, StoreError, CHUNK_SIZE};

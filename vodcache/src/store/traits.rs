//! The `ChunkStore` trait: key-value persistence for chunks and metadata.
//!
//! The store is the seam between the write path (downloader) and the read
//! path (range resolver). Chunks are addressed by `(object_id, index)` and
//! are immutable once written; metadata records are small JSON documents
//! mutated only by the downloader.
//!
//! # Atomicity
//!
//! `put_chunk` must be atomic: a reader never observes a partially written
//! chunk, and a failed write leaves previously committed chunks untouched.
//! The downloader awaits each write before issuing the next, so no two chunk
//! writes for the same object are ever in flight concurrently.
//!
//! # Dyn Compatibility
//!
//! Async methods return `Pin<Box<dyn Future>>` so the trait can be used as
//! `Arc<dyn ChunkStore>` and backends can be swapped without generics at the
//! call sites.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use super::meta::ObjectMeta;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur against the chunk store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure in the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A metadata record exists but cannot be decoded, or an object id is
    /// not usable as a storage key.
    #[error("corrupt record for object {object_id}: {reason}")]
    Corrupt { object_id: String, reason: String },
}

/// Key-value persistence for binary chunks and object metadata.
pub trait ChunkStore: Send + Sync {
    /// Persist a chunk under `(object_id, index)`, replacing any existing
    /// chunk with the same identity.
    ///
    /// The write is durable when the returned future resolves.
    fn put_chunk(
        &self,
        object_id: &str,
        index: u32,
        data: Bytes,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Fetch a chunk. Returns `Ok(None)` when the chunk was never written,
    /// which a download interrupted mid-stream legitimately produces.
    fn get_chunk(
        &self,
        object_id: &str,
        index: u32,
    ) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>>;

    /// Create or replace the metadata record for an object.
    fn put_meta(&self, meta: ObjectMeta) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Fetch the metadata record for an object, if one exists.
    fn get_meta(&self, object_id: &str) -> BoxFuture<'_, Result<Option<ObjectMeta>, StoreError>>;

    /// Update the progress counters on an existing metadata record.
    ///
    /// `total_size` replaces the stored value only when `Some`; progress-only
    /// ticks during a download pass `None` to leave the provisional size as
    /// is. Last writer wins.
    fn update_progress(
        &self,
        object_id: &str,
        bytes_downloaded: u64,
        total_size: Option<u64>,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Delete an object's metadata record and every chunk it owns.
    ///
    /// Deleting an object that does not exist is not an error.
    fn delete_object(&self, object_id: &str) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Enumerate the metadata records of all stored objects.
    fn list_objects(&self) -> BoxFuture<'_, Result<Vec<ObjectMeta>, StoreError>>;
}

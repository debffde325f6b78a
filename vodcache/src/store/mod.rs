//! Chunked object persistence.
//!
//! Objects are stored as a metadata record plus an ordered sequence of
//! fixed-size chunks. All chunks except the last hold exactly [`CHUNK_SIZE`]
//! bytes; the last holds the remainder. The chunk size is a wire-format
//! contract shared by the downloader (writer) and the range resolver
//! (reader), not a per-object tunable.

mod disk;
mod memory;
mod meta;
mod traits;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use meta::ObjectMeta;
pub use traits::{BoxFuture, ChunkStore, StoreError};

/// Fixed chunk size: 2 MiB.
///
/// Changing this value orphans every previously written store; writer and
/// reader must always agree on it.
pub const CHUNK_SIZE: usize = 2 * 1024 * 1024;

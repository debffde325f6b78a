//! Object metadata records.
//!
//! An object is a logical downloadable media item backed by an ordered
//! sequence of chunks. The metadata record carries the aggregate size and
//! progress counters that the downloader maintains and the range resolver
//! consults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a stored object.
///
/// `total_size` is authoritative once known; a value of `0` means the size is
/// still unknown (the origin sent no `Content-Length` and the stream has not
/// reached EOF yet). Only the downloader mutates `bytes_downloaded` and
/// `total_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Unique object identifier.
    pub id: String,

    /// Human-readable title, typically derived from the source URL.
    pub title: String,

    /// Total object size in bytes. `0` means unknown.
    pub total_size: u64,

    /// Bytes persisted so far. Never exceeds `total_size` once that is known.
    pub bytes_downloaded: u64,

    /// MIME type reported by the origin.
    pub mime_type: String,

    /// When the download was first started.
    pub created_at: DateTime<Utc>,
}

impl ObjectMeta {
    /// Create a fresh metadata record at the start of a download.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            total_size: 0,
            bytes_downloaded: 0,
            mime_type: mime_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether every byte of the object has been persisted.
    ///
    /// An object with unknown size is never complete.
    pub fn is_complete(&self) -> bool {
        self.total_size > 0 && self.bytes_downloaded >= self.total_size
    }

    /// Download progress as a fraction in `[0.0, 1.0]`, or `0.0` while the
    /// total size is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.bytes_downloaded as f64 / self.total_size as f64).min(1.0)
        }
    }
}

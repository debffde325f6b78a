//! HTTP byte-range resolution against the chunk store.
//!
//! Given an object id and an optional `Range` header, the resolver computes
//! which chunks cover the requested window, fetches them concurrently,
//! reassembles the exact slice, and reports a transport-independent
//! [`RangeOutcome`]. The HTTP layer in [`crate::server`] turns the outcome
//! into a wire response.
//!
//! # Hole tolerance
//!
//! A chunk absent from the store (a download interrupted mid-stream) is not
//! an error: its region of the response is served zero-filled. Playback
//! continuity wins over strict correctness here; the player will glitch over
//! the hole instead of the request failing outright.

use std::sync::Arc;
use std::sync::OnceLock;

use bytes::Bytes;
use futures::future;
use regex::Regex;
use tracing::debug;

use crate::store::{ChunkStore, StoreError, CHUNK_SIZE};

/// Largest window served for an open-ended range request: 5 MiB.
///
/// A `bytes=N-` request is answered with at most this many bytes, forcing
/// clients to walk large objects in bounded windows instead of demanding the
/// whole remainder in one response.
pub const MAX_RANGE_WINDOW: u64 = 5 * 1024 * 1024;

/// Result of resolving a range request. Status codes and headers in the wire
/// contract map 1:1 onto these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeOutcome {
    /// No object with the requested id exists (404).
    NotFound,

    /// The `Range` header was malformed or outside the object (416).
    NotSatisfiable,

    /// No `Range` header: a bodyless 200 probe advertising range support
    /// (`Accept-Ranges: bytes`, `Content-Length: total_size`). Clients are
    /// expected to immediately re-request with a range.
    Full { total_size: u64, mime_type: String },

    /// A satisfiable range: 206 with `Content-Range: bytes start-end/total`.
    Partial {
        start: u64,
        end: u64,
        total_size: u64,
        mime_type: String,
        body: Bytes,
    },
}

/// Parse a `Range` header of the form `bytes=start-` or `bytes=start-end`.
///
/// Returns `None` for anything that does not match; multi-range and suffix
/// (`bytes=-N`) forms are deliberately unsupported, as in the original wire
/// contract.
pub fn parse_range_header(header: &str) -> Option<(u64, Option<u64>)> {
    static RANGE_RE: OnceLock<Regex> = OnceLock::new();
    let re = RANGE_RE.get_or_init(|| Regex::new(r"bytes=(\d+)-(\d*)").expect("valid range regex"));

    let caps = re.captures(header)?;
    let start = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let end_str = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let end = if end_str.is_empty() {
        None
    } else {
        Some(end_str.parse::<u64>().ok()?)
    };
    Some((start, end))
}

/// Resolves range requests by reassembling chunks from a [`ChunkStore`].
pub struct RangeResolver {
    store: Arc<dyn ChunkStore>,
}

impl RangeResolver {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }

    /// Resolve a request for `object_id` with an optional `Range` header.
    ///
    /// Store failures propagate as [`StoreError`]; everything else, including
    /// malformed headers and missing chunks, is expressed in the outcome.
    pub async fn resolve(
        &self,
        object_id: &str,
        range_header: Option<&str>,
    ) -> Result<RangeOutcome, StoreError> {
        let Some(meta) = self.store.get_meta(object_id).await? else {
            return Ok(RangeOutcome::NotFound);
        };

        let Some(header) = range_header else {
            return Ok(RangeOutcome::Full {
                total_size: meta.total_size,
                mime_type: meta.mime_type,
            });
        };

        let Some((start, requested_end)) = parse_range_header(header) else {
            return Ok(RangeOutcome::NotSatisfiable);
        };

        // An object of unknown size has no addressable last byte yet.
        if meta.total_size == 0 || start > meta.total_size - 1 {
            return Ok(RangeOutcome::NotSatisfiable);
        }

        let end = match requested_end {
            // Cap open-ended requests to the response window.
            None => (start + MAX_RANGE_WINDOW - 1).min(meta.total_size - 1),
            Some(end) => end.min(meta.total_size - 1),
        };
        if end < start {
            return Ok(RangeOutcome::NotSatisfiable);
        }

        let body = self.assemble(object_id, start, end).await?;
        debug!(
            object_id,
            start,
            end,
            len = body.len(),
            "range request resolved"
        );

        Ok(RangeOutcome::Partial {
            start,
            end,
            total_size: meta.total_size,
            mime_type: meta.mime_type,
            body,
        })
    }

    /// Fetch the covering chunks concurrently and cut out `[start, end]`.
    async fn assemble(&self, object_id: &str, start: u64, end: u64) -> Result<Bytes, StoreError> {
        let chunk_size = CHUNK_SIZE as u64;
        let start_chunk = (start / chunk_size) as u32;
        let end_chunk = (end / chunk_size) as u32;

        let fetches = (start_chunk..=end_chunk).map(|index| self.store.get_chunk(object_id, index));
        // Reads are independent; join preserves index order on completion.
        let chunks = future::try_join_all(fetches).await?;

        let span = (end_chunk - start_chunk + 1) as usize;
        let mut buffer = vec![0u8; span * CHUNK_SIZE];
        for (slot, chunk) in chunks.iter().enumerate() {
            if let Some(data) = chunk {
                let offset = slot * CHUNK_SIZE;
                buffer[offset..offset + data.len()].copy_from_slice(data);
            }
            // A missing chunk leaves its region zero-filled.
        }

        let offset = (start - u64::from(start_chunk) * chunk_size) as usize;
        let len = (end - start + 1) as usize;
        Ok(Bytes::copy_from_slice(&buffer[offset..offset + len]))
    }
}

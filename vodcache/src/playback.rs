//! Playback source selection.
//!
//! A player asking for an object should get local bytes when the download is
//! complete, stream from the origin when it is not, and be told when the URL
//! belongs to an embed-only host that never hands out raw media.

use std::sync::Arc;

use crate::store::{ChunkStore, StoreError};

/// Hosts that only serve media through their own embedded player.
const EMBED_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com"];

/// Where a player should read an object from.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSource {
    /// The object is fully downloaded: serve it through the local range
    /// endpoint for `object_id`.
    LocalRange { object_id: String },

    /// The object is absent or incomplete: stream directly from the origin.
    RemoteUrl { url: String },

    /// The URL is an embed-only host; it cannot be downloaded or range-served
    /// and must be handed to the host's own player.
    EmbeddedExternal { url: String },
}

/// True when `url` points at a host that only allows embedded playback.
pub fn is_embed_only(url: &str) -> bool {
    let host = url
        .split("//")
        .nth(1)
        .unwrap_or(url)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    let host = host.strip_prefix("www.").unwrap_or(host);
    EMBED_HOSTS
        .iter()
        .any(|embed| host == *embed || host.ends_with(&format!(".{embed}")))
}

/// Pick the playback source for `object_id` backed by `url`.
///
/// Embed-only URLs win over store state; a partially downloaded object falls
/// back to the origin rather than serving holes to a player that asked for
/// the whole file.
pub async fn resolve_source(
    store: &Arc<dyn ChunkStore>,
    object_id: &str,
    url: &str,
) -> Result<PlaybackSource, StoreError> {
    if is_embed_only(url) {
        return Ok(PlaybackSource::EmbeddedExternal {
            url: url.to_string(),
        });
    }

    match store.get_meta(object_id).await? {
        Some(meta) if meta.is_complete() => Ok(PlaybackSource::LocalRange {
            object_id: object_id.to_string(),
        }),
        _ => Ok(PlaybackSource::RemoteUrl {
            url: url.to_string(),
        }),
    }
}

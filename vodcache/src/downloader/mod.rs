//! Streaming chunked downloader.
//!
//! Consumes a remote byte stream incrementally, slices it into
//! [`CHUNK_SIZE`]-aligned chunks through an accumulation buffer, persists
//! each chunk as it fills, and reports monotonic progress. Writes are
//! strictly sequential: each `put_chunk` is awaited before more stream data
//! is consumed, so no two writes for one object are ever in flight at once.
//!
//! There are no internal retries. A mid-stream failure propagates to the
//! caller and leaves the object in a truthfully partial state; a later
//! attempt re-downloads from chunk 0, overwriting as it goes.

pub(crate) mod fetch;

use std::sync::Arc;

use bytes::BytesMut;
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{ChunkStore, ObjectMeta, StoreError, CHUNK_SIZE};

pub use fetch::{FetchError, FetchedBody, Fetcher, HttpFetcher};

/// Progress callback: `(bytes_downloaded, total_size)`.
///
/// `total_size` is `0` while the origin has not revealed the size.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Errors fatal to a single download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The origin request or stream failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A store write failed. Previously committed chunks remain valid.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another download for the same object id is still running.
    #[error("download already in flight for object {0}")]
    InFlight(String),
}

/// Fetches a remote object and persists it as fixed-size chunks.
pub struct Downloader {
    store: Arc<dyn ChunkStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl Downloader {
    pub fn new(store: Arc<dyn ChunkStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Download `url` into the store under `object_id`.
    ///
    /// The object title is derived from the URL's last path segment, matching
    /// what playlist importers display before any richer metadata exists.
    pub async fn download(
        &self,
        url: &str,
        object_id: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<(), DownloadError> {
        let body = self.fetcher.fetch(url).await?;
        info!(object_id, url, total_size = body.total_size, "download started");
        self.ingest(object_id, title_from_url(url), body, on_progress)
            .await
    }

    /// Persist an already-open byte stream as chunks under `object_id`.
    ///
    /// This is the whole write path; `download` is a thin wrapper that opens
    /// the stream first. Exposed so callers with non-HTTP sources can reuse
    /// the chunking discipline.
    pub async fn ingest(
        &self,
        object_id: &str,
        title: String,
        body: FetchedBody,
        on_progress: Option<ProgressCallback>,
    ) -> Result<(), DownloadError> {
        let provisional_total = body.total_size;

        let mut meta = ObjectMeta::new(object_id, title, body.mime_type);
        meta.total_size = provisional_total;
        self.store.put_meta(meta).await?;

        let mut stream = body.stream;
        let mut buffer = BytesMut::with_capacity(CHUNK_SIZE);
        let mut index: u32 = 0;
        let mut downloaded: u64 = 0;

        while let Some(segment) = stream.next().await {
            let segment = segment?;
            let mut offset = 0;
            while offset < segment.len() {
                let space = CHUNK_SIZE - buffer.len();
                let take = space.min(segment.len() - offset);
                buffer.extend_from_slice(&segment[offset..offset + take]);
                offset += take;
                downloaded += take as u64;

                if buffer.len() == CHUNK_SIZE {
                    // split() hands off the filled buffer and leaves an empty
                    // one behind, reusing the allocation.
                    self.store
                        .put_chunk(object_id, index, buffer.split().freeze())
                        .await?;
                    index += 1;
                    self.store
                        .update_progress(object_id, downloaded, None)
                        .await?;
                    if let Some(ref cb) = on_progress {
                        cb(downloaded, provisional_total);
                    }
                }
            }
        }

        // The tail of the stream rarely lands on a chunk boundary; persist
        // the remainder as the final, smaller chunk.
        if !buffer.is_empty() {
            self.store
                .put_chunk(object_id, index, buffer.split().freeze())
                .await?;
        }

        // A missing or wrong Content-Length must not leave the object
        // permanently "incomplete": trust what actually arrived.
        let final_total = provisional_total.max(downloaded);
        self.store
            .update_progress(object_id, downloaded, Some(final_total))
            .await?;
        if let Some(ref cb) = on_progress {
            cb(downloaded, final_total);
        }

        debug!(object_id, bytes = downloaded, "download finished");
        Ok(())
    }

    /// Delete an object's chunks and metadata.
    pub async fn delete(&self, object_id: &str) -> Result<(), StoreError> {
        self.store.delete_object(object_id).await
    }
}

/// Derive a display title from a URL: the last non-empty path segment, with
/// any query string stripped; `video.mp4` when the URL has no usable path.
fn title_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("video.mp4")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use proptest::prelude::*;

    use super::fetch::testing::CannedFetcher;
    use super::*;
    use crate::store::MemoryStore;

    const URL: &str = "http://origin/videos/lesson-01.mp4";

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn downloader_with(payload: Vec<u8>, segment_size: usize) -> (Downloader, Arc<MemoryStore>) {
        let mut fetcher = CannedFetcher::new(segment_size);
        fetcher.insert(URL, payload);
        let store = Arc::new(MemoryStore::new());
        (
            Downloader::new(store.clone(), Arc::new(fetcher)),
            store,
        )
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(title_from_url(URL), "lesson-01.mp4");
        assert_eq!(
            title_from_url("https://cdn.example.com/a/b/c.webm?token=x"),
            "c.webm"
        );
        assert_eq!(title_from_url("https://example.com/"), "example.com");
        assert_eq!(title_from_url("http://"), "video.mp4");
    }

    #[tokio::test]
    async fn test_download_writes_expected_chunks() {
        // 2.5 MiB: one full chunk plus a 0.5 MiB tail.
        let total = CHUNK_SIZE + CHUNK_SIZE / 2;
        let (downloader, store) = downloader_with(patterned(total), 64 * 1024);

        downloader.download(URL, "vid_1", None).await.unwrap();

        assert_eq!(store.chunk_count_for("vid_1"), 2);
        let chunk0 = store.get_chunk("vid_1", 0).await.unwrap().unwrap();
        let chunk1 = store.get_chunk("vid_1", 1).await.unwrap().unwrap();
        assert_eq!(chunk0.len(), CHUNK_SIZE);
        assert_eq!(chunk1.len(), CHUNK_SIZE / 2);

        let meta = store.get_meta("vid_1").await.unwrap().unwrap();
        assert_eq!(meta.total_size, total as u64);
        assert_eq!(meta.bytes_downloaded, total as u64);
        assert!(meta.is_complete());
        assert_eq!(meta.title, "lesson-01.mp4");
    }

    #[tokio::test]
    async fn test_exact_multiple_of_chunk_size_has_no_tail() {
        let total = 2 * CHUNK_SIZE;
        let (downloader, store) = downloader_with(patterned(total), 100_000);

        downloader.download(URL, "vid_1", None).await.unwrap();

        assert_eq!(store.chunk_count_for("vid_1"), 2);
        assert_eq!(
            store
                .get_chunk("vid_1", 1)
                .await
                .unwrap()
                .unwrap()
                .len(),
            CHUNK_SIZE
        );
        assert!(store.get_chunk("vid_1", 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_size_becomes_known_at_eof() {
        let total = CHUNK_SIZE + 123;
        let mut fetcher = CannedFetcher::new(8192);
        fetcher.insert(URL, patterned(total));
        fetcher.announce_size = false;
        let store = Arc::new(MemoryStore::new());
        let downloader = Downloader::new(store.clone(), Arc::new(fetcher));

        let last_total = Arc::new(AtomicU64::new(u64::MAX));
        let seen = last_total.clone();
        downloader
            .download(
                URL,
                "vid_1",
                Some(Box::new(move |_d, t| seen.store(t, Ordering::SeqCst))),
            )
            .await
            .unwrap();

        let meta = store.get_meta("vid_1").await.unwrap().unwrap();
        assert_eq!(meta.total_size, total as u64);
        assert!(meta.is_complete());
        // The final callback carries the resolved total.
        assert_eq!(last_total.load(Ordering::SeqCst), total as u64);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let total = 3 * CHUNK_SIZE + 17;
        let (downloader, _store) = downloader_with(patterned(total), 700_001);

        let last = Arc::new(AtomicU64::new(0));
        let seen = last.clone();
        downloader
            .download(
                URL,
                "vid_1",
                Some(Box::new(move |d, _t| {
                    let prev = seen.swap(d, Ordering::SeqCst);
                    assert!(d >= prev, "progress went backwards: {prev} -> {d}");
                })),
            )
            .await
            .unwrap();

        assert_eq!(last.load(Ordering::SeqCst), total as u64);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_committed_chunks() {
        let total = 3 * CHUNK_SIZE;
        let mut fetcher = CannedFetcher::new(512 * 1024);
        fetcher.insert(URL, patterned(total));
        // Fail after one full chunk plus a bit.
        fetcher.fail_after = Some(CHUNK_SIZE + 100);
        let store = Arc::new(MemoryStore::new());
        let downloader = Downloader::new(store.clone(), Arc::new(fetcher));

        let err = downloader.download(URL, "vid_1", None).await.unwrap_err();
        assert!(matches!(err, DownloadError::Fetch(FetchError::Network(_))));

        // Chunk 0 was committed before the failure; the partial tail was not.
        assert!(store.get_chunk("vid_1", 0).await.unwrap().is_some());
        assert!(store.get_chunk("vid_1", 1).await.unwrap().is_none());

        let meta = store.get_meta("vid_1").await.unwrap().unwrap();
        assert_eq!(meta.bytes_downloaded, CHUNK_SIZE as u64);
        assert!(!meta.is_complete());
    }

    #[tokio::test]
    async fn test_non_2xx_fails_fast() {
        let fetcher = CannedFetcher::new(1024);
        let store = Arc::new(MemoryStore::new());
        let downloader = Downloader::new(store.clone(), Arc::new(fetcher));

        let err = downloader
            .download("http://origin/missing", "vid_1", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Fetch(FetchError::Status { status: 404, .. })
        ));
        // Nothing was recorded for the failed request.
        assert!(store.get_meta("vid_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_overwrites_from_index_zero() {
        let total = CHUNK_SIZE + 10;
        let (downloader, store) = downloader_with(patterned(total), 4096);

        downloader.download(URL, "vid_1", None).await.unwrap();
        downloader.download(URL, "vid_1", None).await.unwrap();

        assert_eq!(store.chunk_count_for("vid_1"), 2);
        let meta = store.get_meta("vid_1").await.unwrap().unwrap();
        assert_eq!(meta.bytes_downloaded, total as u64);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 12, ..ProptestConfig::default() })]

        /// For any payload size and framing, the number of chunks written is
        /// ceil(T / C) and the chunk sizes sum to bytes_downloaded exactly.
        #[test]
        fn prop_chunk_layout(total in 1usize..(3 * CHUNK_SIZE), segment in 1usize..900_000) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async move {
                let (downloader, store) = downloader_with(patterned(total), segment);
                downloader.download(URL, "vid_p", None).await.unwrap();

                let expected_chunks = total.div_ceil(CHUNK_SIZE);
                prop_assert_eq!(store.chunk_count_for("vid_p"), expected_chunks);

                let mut sum = 0usize;
                for i in 0..expected_chunks as u32 {
                    let chunk = store.get_chunk("vid_p", i).await.unwrap().unwrap();
                    if (i as usize) < expected_chunks - 1 {
                        prop_assert_eq!(chunk.len(), CHUNK_SIZE);
                    }
                    sum += chunk.len();
                }
                let meta = store.get_meta("vid_p").await.unwrap().unwrap();
                prop_assert_eq!(sum as u64, meta.bytes_downloaded);
                prop_assert_eq!(meta.total_size, total as u64);
                Ok(())
            })?;
        }
    }
}

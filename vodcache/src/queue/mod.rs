//! Sequential download queue.
//!
//! Drives one [`Downloader`] run per item, strictly in list order, one item
//! at a time. Sequential processing bounds bandwidth and memory and keeps a
//! single deterministic index for progress display. A failing item is
//! reported through the completion callback and does not abort the rest of
//! the queue.
//!
//! # Single-flight guard
//!
//! The orchestrator owns a per-object-id in-flight guard: starting a second
//! download for an id that is still running fails with
//! [`DownloadError::InFlight`] instead of silently racing chunk writes. The
//! guard is released on completion or failure.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::downloader::{DownloadError, Downloader};
use crate::store::ChunkStore;

/// One entry in a download queue.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: String,
    pub url: String,
}

/// Per-tick progress callback: `(object_id, bytes_downloaded, total_size)`.
pub type QueueProgress = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Per-item completion callback: `(object_id, result)`.
pub type QueueCompletion = Arc<dyn Fn(&str, &Result<(), DownloadError>) + Send + Sync>;

/// Summary of a queue run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueReport {
    /// Ids downloaded successfully in this run.
    pub succeeded: Vec<String>,
    /// Ids whose download failed.
    pub failed: Vec<String>,
    /// Ids skipped because they were already complete.
    pub skipped: Vec<String>,
}

/// RAII token marking an object id as having a download in flight.
struct InFlightGuard {
    id: String,
    registry: Arc<DashMap<String, ()>>,
}

impl InFlightGuard {
    fn acquire(registry: &Arc<DashMap<String, ()>>, id: &str) -> Option<Self> {
        use dashmap::mapref::entry::Entry;
        match registry.entry(id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    id: id.to_string(),
                    registry: registry.clone(),
                })
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

/// Sequential driver for multi-object downloads.
pub struct QueueOrchestrator {
    downloader: Downloader,
    store: Arc<dyn ChunkStore>,
    in_flight: Arc<DashMap<String, ()>>,
}

impl QueueOrchestrator {
    pub fn new(downloader: Downloader, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            downloader,
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Process `items` in order. Already-complete objects are skipped (their
    /// callbacks still fire, so progress displays account for them).
    pub async fn run(
        &self,
        items: &[QueueItem],
        on_progress: Option<QueueProgress>,
        on_complete: Option<QueueCompletion>,
    ) -> QueueReport {
        let mut report = QueueReport::default();

        for item in items {
            if let Ok(Some(meta)) = self.store.get_meta(&item.id).await {
                if meta.is_complete() {
                    info!(object_id = %item.id, "already complete, skipping");
                    if let Some(ref progress) = on_progress {
                        progress(&item.id, meta.bytes_downloaded, meta.total_size);
                    }
                    if let Some(ref complete) = on_complete {
                        complete(&item.id, &Ok(()));
                    }
                    report.skipped.push(item.id.clone());
                    continue;
                }
            }

            let result = self.download_one(item, on_progress.clone()).await;
            match &result {
                Ok(()) => report.succeeded.push(item.id.clone()),
                Err(e) => {
                    warn!(object_id = %item.id, error = %e, "queue item failed");
                    report.failed.push(item.id.clone());
                }
            }
            if let Some(ref complete) = on_complete {
                complete(&item.id, &result);
            }
        }

        report
    }

    /// Download a single item under the in-flight guard.
    pub async fn download_one(
        &self,
        item: &QueueItem,
        on_progress: Option<QueueProgress>,
    ) -> Result<(), DownloadError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &item.id) else {
            return Err(DownloadError::InFlight(item.id.clone()));
        };

        let per_item = on_progress.map(|progress| {
            let id = item.id.clone();
            Box::new(move |downloaded, total| progress(&id, downloaded, total))
                as crate::downloader::ProgressCallback
        });

        self.downloader.download(&item.url, &item.id, per_item).await
    }
}

/// Aggregates per-item progress fractions into one queue-wide percentage,
/// mirroring the original UI's global progress panel.
pub struct QueueProgressTracker {
    fractions: DashMap<String, f64>,
    item_count: usize,
}

impl QueueProgressTracker {
    pub fn new(item_count: usize) -> Self {
        Self {
            fractions: DashMap::new(),
            item_count,
        }
    }

    /// Record a progress tick and return the overall percentage in
    /// `[0.0, 100.0]`. Items with unknown total contribute zero until their
    /// size is known.
    pub fn update(&self, id: &str, bytes_downloaded: u64, total_size: u64) -> f64 {
        let fraction = if total_size > 0 {
            (bytes_downloaded as f64 / total_size as f64).min(1.0)
        } else {
            0.0
        };
        self.fractions.insert(id.to_string(), fraction);

        if self.item_count == 0 {
            return 100.0;
        }
        let sum: f64 = self.fractions.iter().map(|entry| *entry.value()).sum();
        sum / self.item_count as f64 * 100.0
    }
}

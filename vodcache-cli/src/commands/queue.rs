//! `vodcache queue` command.
//!
//! Reads a JSON queue file and downloads every item in order:
//!
//! ```json
//! [
//!   { "id": "lesson-01", "url": "https://cdn.example.com/lesson-01.mp4" },
//!   { "url": "https://cdn.example.com/lesson-02.mp4" }
//! ]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use vodcache::queue::QueueProgressTracker;
use vodcache::{ConfigFile, QueueItem, QueueOrchestrator};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct QueueArgs {
    /// Path to the JSON queue file
    file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct QueueFileItem {
    #[serde(default)]
    id: Option<String>,
    url: String,
}

pub async fn run(args: QueueArgs, config: &ConfigFile) -> Result<(), CliError> {
    let items = read_queue_file(&args)?;
    if items.is_empty() {
        println!("Queue file is empty, nothing to do.");
        return Ok(());
    }

    let (downloader, store) = super::build_downloader(config)?;
    let queue = QueueOrchestrator::new(downloader, store);

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{wide_bar} {pos}% ({msg})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let tracker = Arc::new(QueueProgressTracker::new(items.len()));

    let progress = {
        let bar = bar.clone();
        let tracker = tracker.clone();
        Arc::new(move |id: &str, downloaded: u64, total: u64| {
            let percent = tracker.update(id, downloaded, total);
            bar.set_position(percent as u64);
            bar.set_message(id.to_string());
        }) as vodcache::queue::QueueProgress
    };
    let completion = Arc::new(|id: &str, result: &Result<(), vodcache::DownloadError>| {
        if let Err(e) = result {
            eprintln!("{id}: {e}");
        }
    }) as vodcache::queue::QueueCompletion;

    let report = queue.run(&items, Some(progress), Some(completion)).await;
    bar.finish_and_clear();

    println!(
        "Queue finished: {} downloaded, {} already complete, {} failed",
        report.succeeded.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for id in &report.failed {
        println!("  failed: {id}");
    }
    Ok(())
}

fn read_queue_file(args: &QueueArgs) -> Result<Vec<QueueItem>, CliError> {
    let raw = std::fs::read_to_string(&args.file).map_err(|e| CliError::QueueFile {
        path: args.file.display().to_string(),
        reason: e.to_string(),
    })?;
    let entries: Vec<QueueFileItem> =
        serde_json::from_str(&raw).map_err(|e| CliError::QueueFile {
            path: args.file.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let id = entry
                .id
                .unwrap_or_else(|| super::download::id_from_url(&entry.url));
            QueueItem { id, url: entry.url }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_queue_file_with_and_without_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(
            &path,
            r#"[
                { "id": "lesson-01", "url": "http://o/a.mp4" },
                { "url": "http://o/b.mp4" }
            ]"#,
        )
        .unwrap();

        let items = read_queue_file(&QueueArgs { file: path }).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "lesson-01");
        assert_eq!(items[1].id, "b.mp4");
    }

    #[test]
    fn test_bad_json_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, "not json").unwrap();

        let err = read_queue_file(&QueueArgs { file: path }).unwrap_err();
        assert!(matches!(err, CliError::QueueFile { .. }));
    }
}

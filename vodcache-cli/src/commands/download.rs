//! `vodcache download` command.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use vodcache::{ConfigFile, ProgressCallback};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// URL of the media file to download
    url: String,

    /// Object id to store it under; derived from the URL filename when omitted
    #[arg(long)]
    id: Option<String>,
}

pub async fn run(args: DownloadArgs, config: &ConfigFile) -> Result<(), CliError> {
    let (downloader, _store) = super::build_downloader(config)?;
    let object_id = args.id.unwrap_or_else(|| id_from_url(&args.url));

    println!("Downloading {} as {object_id}", args.url);
    let bar = byte_progress_bar();
    let callback = progress_callback(bar.clone());

    downloader
        .download(&args.url, &object_id, Some(callback))
        .await?;
    bar.finish();
    println!("Done.");
    Ok(())
}

/// Progress bar in bytes; the length appears once the origin reveals it.
pub fn byte_progress_bar() -> ProgressBar {
    let bar = ProgressBar::no_length();
    bar.set_style(
        ProgressStyle::with_template("{bytes}/{total_bytes} {wide_bar} {bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

pub fn progress_callback(bar: ProgressBar) -> ProgressCallback {
    Box::new(move |downloaded, total| {
        if total > 0 && bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(downloaded);
    })
}

/// Sanitize the URL's filename into a storage key.
pub fn id_from_url(url: &str) -> String {
    let name = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .find(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("video");
    let id: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    id.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_url() {
        assert_eq!(id_from_url("http://o/videos/lesson 01.mp4"), "lesson_01.mp4");
        assert_eq!(id_from_url("http://o/a/b.mp4?tok=1"), "b.mp4");
        assert_eq!(id_from_url("http://"), "video");
        assert_eq!(id_from_url("http://o/.hidden"), "hidden");
    }
}

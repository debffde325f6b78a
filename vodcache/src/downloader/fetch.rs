//! Fetch abstraction over the origin HTTP server.
//!
//! The downloader consumes bytes through the `Fetcher` trait rather than
//! calling reqwest directly. This keeps the chunking logic testable with
//! in-memory byte streams and leaves the door open for alternative sources.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use thiserror::Error;

use crate::store::BoxFuture;

/// Default timeout for origin requests. Video files are large, so this is a
/// per-read idle ceiling rather than a whole-transfer budget.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// How much of an error response body is surfaced in `FetchError::Status`.
const BODY_EXCERPT_CHARS: usize = 100;

/// Errors raised while fetching from the origin.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The origin answered with a non-2xx status.
    #[error("HTTP {status}: {body_excerpt}")]
    Status { status: u16, body_excerpt: String },

    /// Connection, TLS, or mid-stream transport failure.
    #[error("network error: {0}")]
    Network(String),
}

/// An open response body ready for incremental consumption.
pub struct FetchedBody {
    /// Provisional total size from `Content-Length`; `0` when the origin did
    /// not say (the true size becomes known only at EOF).
    pub total_size: u64,

    /// MIME type from `Content-Type`, defaulting to `video/mp4`.
    pub mime_type: String,

    /// The byte stream itself.
    pub stream: BoxStream<'static, Result<Bytes, FetchError>>,
}

impl std::fmt::Debug for FetchedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedBody")
            .field("total_size", &self.total_size)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Source of remote byte streams.
pub trait Fetcher: Send + Sync {
    /// Issue a GET for `url` and hand back the streaming body.
    ///
    /// Fails fast with [`FetchError::Status`] on a non-2xx response,
    /// surfacing the status and a truncated body excerpt.
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<FetchedBody, FetchError>>;
}

/// Production `Fetcher` backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default connect timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom connect timeout.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<FetchedBody, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    body_excerpt: body.chars().take(BODY_EXCERPT_CHARS).collect(),
                });
            }

            let total_size = response.content_length().unwrap_or(0);
            let mime_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("video/mp4")
                .to_string();

            let stream = response
                .bytes_stream()
                .map_err(|e| FetchError::Network(e.to_string()))
                .boxed();

            Ok(FetchedBody {
                total_size,
                mime_type,
                stream,
            })
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetchers for exercising the download path without a network.

    use std::collections::HashMap;

    use futures::stream;

    use super::*;

    /// Fetcher serving canned payloads keyed by URL, split into segments of
    /// `segment_size` bytes to mimic arbitrary network framing.
    pub struct CannedFetcher {
        payloads: HashMap<String, Vec<u8>>,
        pub segment_size: usize,
        /// When `false`, omit the provisional `Content-Length`.
        pub announce_size: bool,
        /// When `Some`, fail the stream after yielding this many bytes.
        pub fail_after: Option<usize>,
    }

    impl CannedFetcher {
        pub fn new(segment_size: usize) -> Self {
            Self {
                payloads: HashMap::new(),
                segment_size,
                announce_size: true,
                fail_after: None,
            }
        }

        pub fn insert(&mut self, url: &str, payload: Vec<u8>) {
            self.payloads.insert(url.to_string(), payload);
        }
    }

    impl Fetcher for CannedFetcher {
        fn fetch(&self, url: &str) -> BoxFuture<'_, Result<FetchedBody, FetchError>> {
            let payload = self.payloads.get(url).cloned();
            let segment_size = self.segment_size.max(1);
            let announce = self.announce_size;
            let fail_after = self.fail_after;
            Box::pin(async move {
                let payload = payload.ok_or(FetchError::Status {
                    status: 404,
                    body_excerpt: "no such file".to_string(),
                })?;

                let total = payload.len() as u64;
                let limit = fail_after.unwrap_or(payload.len()).min(payload.len());
                let mut segments: Vec<Result<Bytes, FetchError>> = payload[..limit]
                    .chunks(segment_size)
                    .map(|s| Ok(Bytes::copy_from_slice(s)))
                    .collect();
                if fail_after.is_some() {
                    segments.push(Err(FetchError::Network("connection reset".to_string())));
                }

                Ok(FetchedBody {
                    total_size: if announce { total } else { 0 },
                    mime_type: "video/mp4".to_string(),
                    stream: stream::iter(segments).boxed(),
                })
            })
        }
    }
}

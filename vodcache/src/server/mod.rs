//! HTTP front for the range resolver.
//!
//! Exposes a single endpoint, `GET /offline-video/:object_id`, speaking the
//! same wire contract a media player expects from any range-capable origin:
//! a bodyless 200 probe advertising `Accept-Ranges: bytes`, 206 partials
//! with `Content-Range`, 404 for unknown objects, and 416 for anything the
//! resolver refuses to satisfy.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tracing::{error, info};

use crate::range::{RangeOutcome, RangeResolver};

/// Errors from running the serving loop.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct AppState {
    resolver: Arc<RangeResolver>,
}

/// Build the router serving range requests from `resolver`.
pub fn router(resolver: Arc<RangeResolver>) -> Router {
    Router::new()
        .route("/offline-video/:object_id", get(serve_object))
        .with_state(AppState { resolver })
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(resolver: Arc<RangeResolver>, addr: SocketAddr) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    info!(%addr, "serving range requests");

    axum::serve(listener, router(resolver))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}

async fn serve_object(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    match state.resolver.resolve(&object_id, range_header).await {
        Ok(outcome) => outcome_to_response(outcome),
        Err(e) => {
            error!(object_id, error = %e, "range resolution failed");
            plain_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Map a resolver outcome onto the wire contract.
fn outcome_to_response(outcome: RangeOutcome) -> Response {
    match outcome {
        RangeOutcome::NotFound => plain_status(StatusCode::NOT_FOUND),

        RangeOutcome::NotSatisfiable => plain_status(StatusCode::RANGE_NOT_SATISFIABLE),

        // The probe carries no body; the advertised length tells the player
        // how far it may seek before it starts issuing ranges.
        RangeOutcome::Full {
            total_size,
            mime_type,
        } => response_builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, total_size)
            .body(Body::empty())
            .unwrap_or_else(|_| plain_status(StatusCode::INTERNAL_SERVER_ERROR)),

        RangeOutcome::Partial {
            start,
            end,
            total_size,
            mime_type,
            body,
        } => response_builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, body.len())
            .header(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{total_size}"),
            )
            .body(Body::from(body))
            .unwrap_or_else(|_| plain_status(StatusCode::INTERNAL_SERVER_ERROR)),
    }
}

fn response_builder() -> axum::http::response::Builder {
    Response::builder().header(header::ACCEPT_RANGES, "bytes")
}

fn plain_status(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

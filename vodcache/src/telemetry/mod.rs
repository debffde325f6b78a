//! Logging setup.
//!
//! One `init` call wires up a tracing subscriber: level filtering from the
//! config (overridable via `RUST_LOG`), human-readable output on stderr,
//! and optionally a non-blocking file writer for long-running serve
//! sessions.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive.
///
/// Dropping the guard flushes and stops the file writer, so hold it for the
/// life of the process.
pub struct TelemetryGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize the global subscriber.
///
/// `level` is the default filter directive (`error`..`trace`); `RUST_LOG`
/// overrides it when set. With `log_file`, output goes to the file instead
/// of stderr. A second call is a no-op, which keeps test setups that each
/// call `init` from panicking.
pub fn init(level: &str, log_file: Option<&Path>) -> TelemetryGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| "vodcache.log".as_ref());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            TelemetryGuard {
                _file_guard: Some(guard),
            }
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            TelemetryGuard { _file_guard: None }
        }
    }
}

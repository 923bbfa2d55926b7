use std::sync::Once;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Default filter directive used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

/// Guard that flushes buffered log lines when dropped.
///
/// Binaries must hold on to it until they exit, otherwise the tail of the log is lost.
pub type LogFlusher = WorkerGuard;

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber was already installed for this process.
    #[error("failed to install the tracing subscriber for `{service}`: {reason}")]
    Install { service: String, reason: String },
}

static INIT_TEST_TRACING: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the process-wide tracing subscriber for a binary.
///
/// Log lines go to stderr through a non-blocking writer so that stdout stays free for
/// command output. The verbosity is controlled through `RUST_LOG`.
pub fn init_tracing(service: &str) -> Result<LogFlusher, TracingError> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_target(false)
        .try_init()
        .map_err(|err| TracingError::Install {
            service: service.to_string(),
            reason: err.to_string(),
        })?;

    ::tracing::debug!(service, "tracing initialized");

    Ok(guard)
}

/// Installs a subscriber that writes through the test harness capture.
///
/// Safe to call from every test; only the first call has an effect.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    });
}

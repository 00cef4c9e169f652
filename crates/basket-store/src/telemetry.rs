//! Tracing subscriber setup for binaries embedding the store.

use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;

use crate::error::{StoreError, StoreResult};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=basket=trace` - Show trace for basket crates only
/// - Default: `default_filter` (normally `logging.filter` from config)
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> StoreResult<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    subscriber(rust_log.as_deref(), default_filter)
        .try_init()
        .map_err(|e| StoreError::Telemetry(e.to_string()))
}

/// `RUST_LOG` wins when it parses; otherwise the configured filter applies.
fn subscriber(
    rust_log: Option<&str>,
    default_filter: &str,
) -> SubscriberBuilder<DefaultFields, Format, EnvFilter> {
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter)
}

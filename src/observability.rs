//! Logging initialization.

use tracing_subscriber::EnvFilter;

use crate::config::Environment;

/// Installs the global `tracing` subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`). Production logs are JSON,
/// development logs are human-readable. Safe to call multiple times
/// (subsequent calls are no-ops).
pub fn init(environment: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if environment.is_production() {
        builder.json().with_target(false).try_init()
    } else {
        builder.try_init()
    };
}

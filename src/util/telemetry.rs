//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "credential_lot=info";

/// Install an env-filtered fmt subscriber unless the host already set one.
///
/// `RUST_LOG` takes precedence; otherwise [`DEFAULT_LOG_FILTER`] applies so
/// slot binding, settlement and admission denials show up out of the box.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

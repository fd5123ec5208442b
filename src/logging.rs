//! Logging initialization.
//!
//! Installs the `tracing` subscriber once per process: stderr output so
//! stdout stays clean for command results, `RUST_LOG`-driven filtering
//! with an `info` default.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging. Safe to call once per process; later
/// calls are ignored.
pub fn init_logging(level: Option<&str>) {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(level.unwrap_or(&default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    // try_init so tests that initialize repeatedly do not panic.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

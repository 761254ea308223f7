//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,planetfolio=debug,wgpu=warn,naga=warn";

/// Initialize the tracing subscriber.
///
/// Filtering honours `RUST_LOG` and falls back to [`DEFAULT_FILTER`]. Calling this
/// more than once is harmless: later calls leave the first subscriber in place.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

//! Tracing subscriber setup for southboundd.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when set. With `json`
/// every event is written as one JSON object per line.
pub fn init_logging(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

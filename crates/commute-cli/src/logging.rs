//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize logging to stderr.
///
/// Reads `COMMUTE_LOG` for filter directives, e.g.
/// `COMMUTE_LOG=commute_core=debug`. Falls back to `commute=info`, which
/// covers both the binary and the core library.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("COMMUTE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("commute=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}

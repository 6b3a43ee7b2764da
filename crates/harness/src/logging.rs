use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber.
///
/// The level comes from `RUST_LOG`, defaulting to `info`. Output goes through
/// the test writer so it is captured per test. Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .compact();
        // another subscriber may already be installed by the test binary
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}

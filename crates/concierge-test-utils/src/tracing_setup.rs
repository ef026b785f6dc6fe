//! Tracing initialisation for tests.
//!
//! Tests annotated with `#[test_log::test]` get a subscriber automatically;
//! [`init_test_tracing`] is for the ones that cannot use the attribute.

use tracing_subscriber::EnvFilter;

/// Install a subscriber that writes to the test harness and honours
/// `RUST_LOG` (default `concierge_core=debug`).
///
/// Only the first call in a process installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("concierge_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

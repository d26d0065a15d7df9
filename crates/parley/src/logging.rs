//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a compact stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (for example
/// `"info"` or `"parley=debug"`) is used. Calling this more than once is
/// harmless: later calls are ignored.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

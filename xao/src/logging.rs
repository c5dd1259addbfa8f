//! Log output for applications built on the framework.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber at WARN level by default, respecting
/// `RUST_LOG`. Does nothing if a subscriber is already installed.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

//! # Tracing Bootstrap
//!
//! The host process may or may not have a global subscriber. [`init`]
//! installs a `fmt` subscriber only when none is present.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `filter`.
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one is left untouched. An unparsable filter falls back to
/// `warn`.
pub fn init(filter: &str) -> bool {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

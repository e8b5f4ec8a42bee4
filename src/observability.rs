//! Logging initialization.
//!
//! The crate logs through `tracing`; binaries and tests opt into
//! console output with [`init_logging`].

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV_VAR: &str = "KGFORGE_LOG";

/// Installs a fmt subscriber filtered by `KGFORGE_LOG`, falling back to
/// `RUST_LOG`, then `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

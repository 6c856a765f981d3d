//! # Logging
//!
//! Installs a compact `tracing` subscriber filtered by `RPC_REST_LOG`, which
//! follows the `RUST_LOG` conventions and defaults to `info`.

use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "RPC_REST_LOG";

/// Initializes the global subscriber. Does nothing if one is already set.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init();
}

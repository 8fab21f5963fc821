//! `tracing` subscriber setup for binaries and tests embedding the client.

use crate::config::LoggingConfig;
use crate::protocol_trace;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Builds the filter: `RUST_LOG` when set, else the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs a global fmt subscriber and applies the protocol trace flag.
///
/// Returns `false` when another global subscriber was already installed;
/// the trace flag is applied either way.
pub fn init(config: &LoggingConfig) -> bool {
    if config.protocol_trace {
        protocol_trace::set_enabled(true);
    }

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer())
        .try_init()
        .is_ok()
}

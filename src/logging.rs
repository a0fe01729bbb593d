//! Diagnostic logging to stderr. `RUST_LOG` wins over the -v count when set.

use tracing_subscriber::EnvFilter;

/// Default filter for a given number of -v flags.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. Fails if the filter is invalid or a subscriber is already set.
pub fn init(verbosity: u8) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_for_verbosity(verbosity)))
        .map_err(|e| format!("Invalid log filter: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("Cannot initialize logging: {}", e))
}

/// Logging setup for PyFlow Bridge.
/// Diagnostics go to stderr so stdout stays reserved for flowchart text.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is not set: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

//! Diagnostic logging setup
//!
//! Library code logs through `tracing`; the binary installs a subscriber
//! writing to stderr so stdout stays reserved for command output. Audit
//! events do not go through here, they go to the [`crate::audit`] trail.
//!
//! The filter is taken from `TELLER_LOG`, then `RUST_LOG`, then the `-v`
//! count given on the command line.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`
pub const LOG_ENV: &str = "TELLER_LOG";

/// Level selected by the number of `-v` flags
pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_filter(verbosity: u8) -> Result<EnvFilter> {
    for var in [LOG_ENV, EnvFilter::DEFAULT_ENV] {
        if let Ok(directives) = std::env::var(var) {
            if !directives.trim().is_empty() {
                return EnvFilter::try_new(&directives)
                    .with_context(|| format!("Invalid log filter in {}: {}", var, directives));
            }
        }
    }

    let level = level_for_verbosity(verbosity).to_string().to_lowercase();
    EnvFilter::try_new(format!("teller_ledger={level},teller={level}"))
        .context("Failed to build default log filter")
}

/// Install the global subscriber
///
/// Fails if a subscriber has already been installed.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let filter = build_filter(verbosity)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::debug!(verbosity, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), Level::WARN);
        assert_eq!(level_for_verbosity(1), Level::INFO);
        assert_eq!(level_for_verbosity(2), Level::DEBUG);
        assert_eq!(level_for_verbosity(9), Level::TRACE);
    }
}

//! Logging init for the CLI
//!
//! Logs go to stderr so stdout carries nothing but the JSON record.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,directlink=debug";

/// Filter for `--verbose`
const VERBOSE_FILTER: &str = "info,directlink=trace";

/// Initialize structured logging to stderr
///
/// `verbose` raises the resolver crates to trace level.
pub fn init_logging_stderr(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(VERBOSE_FILTER)
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

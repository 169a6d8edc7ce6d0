//! Logging setup.
//!
//! Logs go to stderr so `--json` output on stdout stays machine-readable.
//! `RUST_LOG` takes precedence unless `--verbose` is given.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::constants::APP_NAME;

/// Filter used when `RUST_LOG` is unset, or always with `--verbose`.
fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(format!("{APP_NAME}={level}"))
}

/// Installs the global `tracing` subscriber.
///
/// Calling it again is a no-op.
pub fn init(verbose: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) if !verbose => filter,
        _ => default_filter(verbose),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
}

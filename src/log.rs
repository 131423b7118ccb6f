//! Logging setup for the CLI and tests.
//!
//! Logs go to stderr so stdout stays clean for formatted output and JSON.
//!
//! ## Environment Variables
//!
//! 1. **`FORMAT_BRIDGE_LOG`** (highest priority) - crate-specific logging control
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for format_bridge

use std::env;
use tracing_subscriber::{fmt, EnvFilter};

const CRATE_TARGET: &str = "format_bridge";

/// Initialize logging.
///
/// `verbose` raises the default to `debug` for this crate; it does not
/// override an explicit environment filter.
///
/// Safe to call multiple times; later calls return an error and leave the
/// first subscriber in place.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    fmt()
        .with_env_filter(create_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

/// Initialize logging for tests. Never panics, even when called from many
/// tests in one process.
#[allow(clippy::let_unit_value)]
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter(false))
        .with_test_writer()
        .try_init();
}

/// Priority: `FORMAT_BRIDGE_LOG` > `RUST_LOG` > defaults.
fn create_filter(verbose: bool) -> EnvFilter {
    if let Ok(level) = env::var("FORMAT_BRIDGE_LOG") {
        return expand_level(&level);
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    let level = if verbose { "debug" } else { "info" };
    EnvFilter::new(format!("warn,{CRATE_TARGET}={level}"))
}

/// `FORMAT_BRIDGE_LOG=debug` means debug for this crate only; anything with
/// directive syntax is used as-is.
fn expand_level(value: &str) -> EnvFilter {
    if value.contains('=') || value.contains(',') || value.contains(':') {
        return EnvFilter::new(value);
    }
    EnvFilter::new(format!("warn,{CRATE_TARGET}={value}"))
}

//! Structured logging and tracing for the terrain core.
//!
//! Provides structured, span-based, filterable logging via the `tracing`
//! ecosystem. Supports console output with timestamps and module paths,
//! plus JSON file logging in debug builds for post-mortem analysis.

use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Sets up structured logging with:
/// - Console output with timestamps, module paths, and severity levels
/// - JSON file logging in debug builds (optional)
/// - Environment-based filtering (respects RUST_LOG)
///
/// # Arguments
///
/// * `log_dir` - Optional directory for JSON log files (debug builds only)
/// * `debug_build` - Whether this is a debug build (enables file logging)
///
/// # Examples
///
/// ```no_run
/// use selene_log::init_logging;
///
/// // Basic initialization
/// init_logging(None, false);
///
/// // With file logging in debug mode
/// let log_dir = std::path::Path::new("./logs");
/// init_logging(Some(log_dir), true);
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool) {
    // Base filter: info by default, overridable via RUST_LOG env var
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter());

    // Console layer: human-readable format with timestamps
    let console_layer = fmt::layer()
        .with_target(true) // Show module path
        .with_thread_ids(false)
        .with_thread_names(true) // Useful when decode workers are named
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    // In debug builds, also log to a file for post-mortem analysis
    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("selene.log"))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false) // No ANSI color codes in file output
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json(); // Structured JSON for machine parsing

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Create an `EnvFilter` with the default filter string.
///
/// `info` level for all targets, with the image decoder quieted to `warn`
/// to reduce per-tile noise.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info,image=warn")
}

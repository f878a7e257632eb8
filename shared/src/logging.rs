//! Shared logging utilities for consistent tracing across the harness

use chrono::{DateTime, Utc};
use tracing::info;

/// Build the filter directive for the harness binaries
///
/// `RUST_LOG` still wins when set; this is only the fallback.
pub fn default_filter(base_level: &str, verbose: bool) -> String {
    if verbose {
        "tester=debug,shared=debug,reqwest=info,info".to_string()
    } else {
        format!("tester={base_level},shared={base_level},reqwest=warn,hyper=warn")
    }
}

/// Initialize the tracing subscriber for a harness process
///
/// Safe to call more than once; later calls are ignored so tests that share
/// a process don't panic on double initialisation.
pub fn init_tracing(verbose: bool, log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(base_level, verbose)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for suite-aware info logging
#[macro_export]
macro_rules! suite_info {
    ($suite:expr, $($arg:tt)*) => {
        tracing::info!(
            suite = %$suite,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for suite-aware warning logging
#[macro_export]
macro_rules! suite_warn {
    ($suite:expr, $($arg:tt)*) => {
        tracing::warn!(
            suite = %$suite,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for suite-aware error logging
#[macro_export]
macro_rules! suite_error {
    ($suite:expr, $($arg:tt)*) => {
        tracing::error!(
            suite = %$suite,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for suite start
pub fn log_suite_start(suite: &str, details: &str) {
    info!(
        suite = %suite,
        timestamp = format_timestamp(),
        "🧪 Starting {}: {}",
        suite,
        details
    );
}

//! Diagnostic logging for the strata CLI.
//!
//! Logging is off unless requested through the environment:
//!
//! - `STRATA_DEBUG=true` - Enable debug logging for all strata crates
//! - `STRATA_LOG=info|debug|...` - Set a level, or a full filter directive
//!   such as `strata_sqlite=debug,warn`
//! - `STRATA_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! Log lines go to stderr so they never mix with command output.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const CRATES: [&str; 3] = ["strata_migrate", "strata_sqlite", "strata_cli"];

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

/// Check if debug logging is enabled via `STRATA_DEBUG`.
pub fn is_debug_enabled() -> bool {
    env::var("STRATA_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Build the filter directive from `STRATA_LOG` and the debug flag.
///
/// Returns `None` when no logging was requested.
pub fn filter_directive(log: Option<&str>, debug: bool) -> Option<String> {
    let level = match log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) if directive.contains('=') || directive.contains(',') => {
            return Some(directive.to_string());
        }
        Some(level) => level.to_lowercase(),
        None if debug => "debug".to_string(),
        None => return None,
    };

    Some(
        CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Parse `STRATA_LOG_FORMAT`.
pub fn parse_format(value: Option<&str>) -> LogFormat {
    match value.map(str::to_lowercase).as_deref() {
        Some("pretty") => LogFormat::Pretty,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Json,
    }
}

/// Initialize the logging system once. Subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let log = env::var("STRATA_LOG").ok();
        let Some(directive) = filter_directive(log.as_deref(), is_debug_enabled()) else {
            return;
        };

        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
        let format = parse_format(env::var("STRATA_LOG_FORMAT").ok().as_deref());
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
        };

        if installed.is_ok() {
            tracing::debug!(filter = %directive, format = ?format, "Logging initialized");
        }
    });
}

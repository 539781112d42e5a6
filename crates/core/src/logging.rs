//! Logging setup.
//!
//! Everything goes to stderr; stdout carries answers and JSON output only.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Options accepted by [`init_logging`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions<'a> {
    /// Explicit filter directive; falls back to `RUST_LOG`, then `info`.
    pub level: Option<&'a str>,
    /// Disable ANSI colors.
    pub no_color: bool,
    /// Emit one JSON object per event.
    pub json: bool,
}

/// Install the global tracing subscriber.
///
/// # Example
/// ```no_run
/// use pagewise_core::logging::{init_logging, LogOptions};
///
/// init_logging(&LogOptions::default()).expect("logging");
/// ```
pub fn init_logging(options: &LogOptions<'_>) -> AppResult<()> {
    let env_filter = build_filter(options.level)?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if options.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!options.no_color && supports_color()),
            )
            .try_init()
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

fn build_filter(level: Option<&str>) -> AppResult<EnvFilter> {
    let directive = match level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
    };

    EnvFilter::try_new(&directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

fn supports_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

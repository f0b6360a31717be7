//! Logger initialisation
//!
//! The crate logs through the `log` facade. Applications that do not bring
//! their own logger can call [`init`] once at startup.

use crate::config::LoggingConfig;
use log::LevelFilter;

/// Parse a level name, falling back to `Info` for unknown values
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        other => {
            log::warn!("Unknown log level '{}', defaulting to info", other);
            LevelFilter::Info
        }
    }
}

/// Install `env_logger` with the configured level
///
/// `RUST_LOG` still wins when set. Returns false if a logger was already
/// installed.
pub fn init(config: &LoggingConfig) -> bool {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(parse_level(&config.level));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.try_init().is_ok()
}

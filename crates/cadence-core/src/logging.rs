//! Logger initialization.
//!
//! Library code logs through the `log` facade; binaries call
//! [`init_logging`] once, early in `main`.

use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "cadence_runtime=debug").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
///
/// Filter precedence: explicit `env_filter`, then `RUST_LOG`, then `info`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);

        // Another logger may already be installed (e.g. by a test harness).
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_filter() {
        let config = LoggingConfig::with_filter("cadence_runtime=debug");
        assert_eq!(config.env_filter.as_deref(), Some("cadence_runtime=debug"));
        assert!(LoggingConfig::default().env_filter.is_none());
    }

    #[test]
    fn test_explicit_filter_and_repeat_init() {
        init_logging(LoggingConfig::with_filter("debug"));
        assert_eq!(log::max_level(), log::LevelFilter::Debug);

        // later calls keep the first configuration
        init_logging(LoggingConfig::with_filter("error"));
        assert_eq!(log::max_level(), log::LevelFilter::Debug);
        log::debug!("still logging");
    }
}

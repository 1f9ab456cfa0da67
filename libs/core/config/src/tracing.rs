use crate::{env_or_default, ConfigError, Environment, FromEnv};
use strum::{Display, EnumString};
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in main() before any fallible operations. Safe to call
/// multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging configuration.
///
/// Environment variables:
/// - `LOG_LEVEL`: default filter directive when `RUST_LOG` is unset (default: "info")
/// - `LOG_FORMAT`: "json" or "pretty" (default: json in production, pretty otherwise)
/// - `RUST_LOG`: overrides `LOG_LEVEL` entirely (e.g. "debug,h2=warn")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn for_environment(environment: &Environment) -> Self {
        Self {
            level: "info".to_string(),
            format: if environment.is_production() {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl FromEnv for LogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::for_environment(&Environment::from_env());

        let format = match std::env::var("LOG_FORMAT") {
            Ok(raw) if !raw.trim().is_empty() => {
                raw.trim()
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::ParseError {
                        key: "LOG_FORMAT".to_string(),
                        details: format!("'{}' is not one of json, pretty", raw),
                    })?
            }
            _ => defaults.format,
        };

        Ok(Self {
            level: env_or_default("LOG_LEVEL", &defaults.level),
            format,
        })
    }
}

/// Initialize tracing with the given configuration and error span capture.
///
/// - **json**: flattened events without module targets, for log aggregation
/// - **pretty**: human-readable multi-line output for local development
///
/// Both variants include `tracing_error::ErrorLayer` so span traces are captured
/// into `eyre` reports.
///
/// Safe to call multiple times; later calls are ignored (common in tests).
pub fn init_tracing(config: &LogConfig) {
    let filter = config.filter();

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init(),
    };

    match result {
        Ok(_) => {
            info!(
                level = %config.level,
                format = %config.format,
                "Tracing initialized with ErrorLayer"
            );
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults_follow_environment() {
        let dev = LogConfig::for_environment(&Environment::Development);
        assert_eq!(dev.level, "info");
        assert_eq!(dev.format, LogFormat::Pretty);

        let prod = LogConfig::for_environment(&Environment::Production);
        assert_eq!(prod.format, LogFormat::Json);
    }

    #[test]
    fn test_log_config_from_env() {
        temp_env::with_vars(
            [
                ("APP_ENV", None),
                ("LOG_LEVEL", Some("debug")),
                ("LOG_FORMAT", Some("JSON")),
            ],
            || {
                let config = LogConfig::from_env().unwrap();
                assert_eq!(config.level, "debug");
                assert_eq!(config.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn test_log_config_rejects_unknown_format() {
        temp_env::with_var("LOG_FORMAT", Some("xml"), || {
            let err = LogConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("LOG_FORMAT"));
        });
    }

    #[test]
    fn test_init_tracing_multiple_calls() {
        let config = LogConfig::for_environment(&Environment::Development);
        init_tracing(&config);
        init_tracing(&config.clone().with_format(LogFormat::Json));
    }

    #[test]
    fn test_init_tracing_with_rust_log_env() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            init_tracing(&LogConfig::for_environment(&Environment::Production));
        });
    }
}

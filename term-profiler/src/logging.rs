//! Logging utilities and configuration for the profiler.
//!
//! The profiler logs through `tracing`. [`LogConfig`] decides how much detail
//! the rule engine emits per column, and [`setup`] installs a
//! `tracing-subscriber` for applications that do not bring their own.

use tracing::Level;

/// Logging configuration for a [`SuiteProfiler`](crate::profiler::SuiteProfiler).
///
/// Profiling a wide table emits one decision per rule and column, so the
/// detailed categories are opt-in.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for profiler components
    pub base_level: Level,
    /// Whether to log every rule decision (emitted, skipped, excluded)
    pub log_rule_details: bool,
    /// Whether to log per-column statistics gathered from the dataset
    pub log_dataset_stats: bool,
    /// Maximum length for logged field values such as value sets
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_rule_details: false,
            log_dataset_stats: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_rule_details: true,
            log_dataset_stats: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_rule_details: false,
            log_dataset_stats: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Debug logging that only formats its arguments when the configured base
/// level admits debug output.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Conditional logging of rule decisions.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Conditional logging of dataset statistics.
#[macro_export]
macro_rules! log_stats {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_dataset_stats {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, on a character boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }

    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Utilities for installing a `tracing` subscriber.
pub mod setup {
    use tracing::Level;

    /// Configuration for the profiler's logging setup.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for profiler components specifically
        pub profiler_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                profiler_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                profiler_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                profiler_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for profiler components.
        pub fn with_profiler_level(mut self, level: Level) -> Self {
            self.profiler_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_profiler={}",
                    self.level.as_str().to_lowercase(),
                    self.profiler_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_profiler::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

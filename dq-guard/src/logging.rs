//! Logging utilities and configuration for dq-guard.
//!
//! The engine emits structured `tracing` events with dotted field names
//! (`table.relation`, `rule.name`, `result.violations`). [`LogConfig`]
//! controls how chatty the per-rule and per-column events are, and
//! [`setup`] wires a `tracing-subscriber` for applications that do not bring
//! their own.

/// Detail switches for the profiler and validator.
///
/// Start and completion events are always emitted. These switches only gate
/// the debug events produced once per rule query or per profiled column.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log the SQL and parameter count of every rule query
    pub log_rule_queries: bool,
    /// Log the counts computed for every column
    pub log_column_stats: bool,
    /// Longest SQL text written to a log field before truncation
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_rule_queries: false,
            log_column_stats: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Every per-rule and per-column event, with long SQL kept intact.
    pub fn verbose() -> Self {
        Self {
            log_rule_queries: true,
            log_column_stats: true,
            max_field_length: 4096,
        }
    }

    /// Lifecycle events only.
    pub fn production() -> Self {
        Self {
            max_field_length: 128,
            ..Self::default()
        }
    }

    /// Column events on, rule SQL off.
    pub fn balanced() -> Self {
        Self {
            log_column_stats: true,
            ..Self::default()
        }
    }
}

/// Emits a debug event when rule query logging is enabled.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_queries {
            tracing::debug!($($arg)*);
        }
    };
}

/// Emits a debug event when column statistics logging is enabled.
#[macro_export]
macro_rules! log_column {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_column_stats {
            tracing::debug!($($arg)*);
        }
    };
}

/// Shortens `value` to at most `max_length` bytes plus a marker.
///
/// Cuts on a character boundary so multi-byte column names survive.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut cut = max_length;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...(truncated)", &value[..cut])
}

/// Subscriber installation for binaries and tests.
pub mod setup {
    use tracing::Level;
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};

    /// Output encoding for log lines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum LogFormat {
        /// Human-readable lines
        #[default]
        Pretty,
        /// One JSON object per event
        Json,
    }

    /// Configuration for the subscriber installed by [`init_logging`].
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for every other target
        pub default_level: Level,
        /// Level for the `dq_guard` target
        pub engine_level: Level,
        pub format: LogFormat,
        /// Raw directives used instead of the two levels above
        pub directives: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                default_level: Level::INFO,
                engine_level: Level::DEBUG,
                format: LogFormat::Pretty,
                directives: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON lines, warnings from dependencies, lifecycle events from the engine.
        pub fn production() -> Self {
            Self {
                default_level: Level::WARN,
                engine_level: Level::INFO,
                format: LogFormat::Json,
                directives: None,
            }
        }

        /// Readable lines with engine traces.
        pub fn development() -> Self {
            Self {
                default_level: Level::DEBUG,
                engine_level: Level::TRACE,
                ..Self::default()
            }
        }

        pub fn with_default_level(mut self, level: Level) -> Self {
            self.default_level = level;
            self
        }

        pub fn with_engine_level(mut self, level: Level) -> Self {
            self.engine_level = level;
            self
        }

        pub fn with_format(mut self, format: LogFormat) -> Self {
            self.format = format;
            self
        }

        /// Uses `directives` (for example `"warn,dq_guard::core=trace"`) verbatim.
        pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
            self.directives = Some(directives.into());
            self
        }

        /// The filter directives this configuration resolves to.
        pub fn directives(&self) -> String {
            match &self.directives {
                Some(directives) => directives.clone(),
                None => format!(
                    "{},dq_guard={}",
                    LevelFilter::from_level(self.default_level),
                    LevelFilter::from_level(self.engine_level)
                ),
            }
        }

        fn env_filter(&self) -> EnvFilter {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(self.default_level).into())
                .with_env_var("RUST_LOG")
                .from_env()
                .unwrap_or_else(|_| EnvFilter::new(self.directives()))
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// A valid `RUST_LOG` takes precedence over the configured levels. Fails
    /// if a global subscriber is already set.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use dq_guard::logging::setup::{init_logging, LogFormat, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_format(LogFormat::Json)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

        let filter = if std::env::var_os("RUST_LOG").is_some() {
            config.env_filter()
        } else {
            EnvFilter::new(config.directives())
        };

        let output = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(output)
            .try_init()?;
        Ok(())
    }
}

//! Structured logging for the boundary layer
//!
//! Design: `tracing` end to end, configured from the environment. A
//! module loaded into an editor host does not own stdout, so file output
//! through a non-blocking appender is the supported path in production;
//! console output on stderr is the development default.

use once_cell::sync::OnceCell;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the non-blocking appender flushing for the process lifetime
static APPENDER_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Write to a log file instead of stderr
    pub file_output: bool,
    /// Log file location when `file_output` is set
    pub log_path: PathBuf,
    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: PathBuf::from("arbor-bridge.log"),
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // ARBOR_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("ARBOR_LOG_LEVEL") {
            if let Some(parsed) = parse_level(&level) {
                config.level = parsed;
            }
        }

        // ARBOR_LOG_FILE: log file path; presence enables file output
        if let Ok(path) = std::env::var("ARBOR_LOG_FILE") {
            if !path.is_empty() {
                config.file_output = true;
                config.log_path = PathBuf::from(path);
            }
        }

        // ARBOR_LOG_JSON: 1/true/yes for JSON lines
        if let Ok(json) = std::env::var("ARBOR_LOG_JSON") {
            config.json_format = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config
    }
}

fn parse_level(text: &str) -> Option<Level> {
    match text.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "arbor_bridge={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let writer = if config.file_output {
            let dir = config
                .log_path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file = config
                .log_path
                .file_name()
                .unwrap_or_else(|| OsStr::new("arbor-bridge.log"));
            let (non_blocking, flush_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
            let _ = APPENDER_GUARD.set(flush_guard);
            BoxMakeWriter::new(non_blocking)
        } else {
            BoxMakeWriter::new(io::stderr)
        };

        let base = tracing_subscriber::registry().with(env_filter);
        if config.json_format {
            base.with(fmt::layer().json().with_writer(writer).with_target(true))
                .init();
        } else {
            base.with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_line_number(cfg!(debug_assertions)),
            )
            .init();
        }
    });
}

/// Log environment context initialization
pub fn log_env_init() {
    use tracing::debug;
    debug!(event = "env_init", "singleton symbols cached");
}

/// Log a predicate declining a value
#[inline]
pub fn log_classify_miss(predicate: &str) {
    use tracing::trace;
    trace!(
        event = "classify_miss",
        predicate = predicate,
        "predicate declined value"
    );
}

/// Log a completed string extraction
#[inline]
pub fn log_string_copied(bytes: usize) {
    use tracing::trace;
    trace!(
        event = "string_copied",
        size_bytes = bytes,
        "string contents extracted"
    );
}

/// Log a refused native allocation
pub fn log_alloc_refused(requested: usize) {
    use tracing::warn;
    warn!(
        event = "alloc_refused",
        requested_bytes = requested,
        "string buffer allocation failed"
    );
}

/// Log a condition being raised toward the host
pub fn log_signal(condition: &str, detail: &str) {
    use tracing::debug;
    debug!(
        event = "signal",
        condition = condition,
        detail = detail,
        "raising host condition"
    );
}

/// Log a record failing shape validation
#[inline]
pub fn log_record_reject(tag: &str, reason: &str) {
    use tracing::trace;
    trace!(
        event = "record_reject",
        tag = tag,
        reason = reason,
        "tagged record failed validation"
    );
}

/// Log a native pointer being boxed for the host
#[inline]
pub fn log_native_wrapped(tag: &str) {
    use tracing::trace;
    trace!(
        event = "native_wrapped",
        tag = tag,
        "native pointer boxed as tagged record"
    );
}

/// Log a successful function registration
pub fn log_registered(name: &str) {
    use tracing::debug;
    debug!(event = "registered", name = name, "function bound in host");
}

/// Log a failed function registration
pub fn log_register_failed(name: &str) {
    use tracing::warn;
    warn!(
        event = "register_failed",
        name = name,
        "binding aborted by pending exit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("error"), Some(Level::ERROR));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.file_output);
        assert!(!config.json_format);
    }

    #[test]
    fn test_repeated_init_is_noop() {
        init_with_config(LogConfig::default());
        init_with_config(LogConfig {
            level: Level::TRACE,
            ..LogConfig::default()
        });
    }
}

//! Logging initialisation
//!
//! Human-readable events go to stderr. When a log directory is configured a
//! second layer writes a daily-rotated file through a non-blocking writer.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::get_env_with_fallback_or;
use crate::error::{CensusError, CensusResult};

/// Log file name prefix inside the log directory
pub const LOG_FILE_PREFIX: &str = "llm-census.log";

/// Build the level filter from `LLM_CENSUS_LOG_LEVEL` (deprecated: `LOG_LEVEL`)
pub fn env_filter() -> CensusResult<EnvFilter> {
    let directives = get_env_with_fallback_or("LLM_CENSUS_LOG_LEVEL", "LOG_LEVEL", "info");
    EnvFilter::try_new(&directives)
        .map_err(|e| CensusError::Logging(format!("invalid log filter '{}': {}", directives, e)))
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the process.
pub fn init(log_dir: Option<&Path>) -> CensusResult<Option<WorkerGuard>> {
    let filter = env_filter()?;
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| CensusError::io(dir, e))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CensusError::Logging(e.to_string()))?;

    Ok(guard)
}

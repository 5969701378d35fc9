//! Logging setup
//!
//! Console output is pretty or JSON; when a log directory is configured a
//! daily-rolling JSON file is written as well. `RUST_LOG` wins over the
//! configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "folio.log";

/// Install the global subscriber
///
/// Keep the returned guard alive for the life of the process, dropping it
/// flushes and stops the file writer.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::config(format!("invalid log level '{level}': {e}")))?;

    let (pretty, json) = match config.format {
        LogFormat::Pretty => (Some(fmt::layer().with_target(false)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(true))),
    };

    let (file, guard) = match config.directory.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .map_err(|e| Error::internal(format!("failed to install log subscriber: {e}")))?;

    Ok(guard)
}

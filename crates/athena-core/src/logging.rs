use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LOG_FILE_NAME;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file in {}: {source}", dir.display())]
    LogFile {
        dir: PathBuf,
        #[source]
        source: InitError,
    },

    #[error("Failed to install tracing subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Keeps the background log writer alive; buffered lines are flushed on drop.
pub struct LoggingGuard {
    log_path: PathBuf,
    _worker: WorkerGuard,
}

impl LoggingGuard {
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// `RUST_LOG` when set, `info` otherwise
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install console + file logging.
///
/// Console output goes to stderr with ANSI colours; the same events are
/// appended without colours to `<log_dir>/athena.log` through a non-blocking
/// writer. Hold the returned guard until the program exits.
pub fn init_logging(log_dir: &Path) -> Result<LoggingGuard, LoggingError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)
        .map_err(|source| LoggingError::LogFile {
            dir: log_dir.to_path_buf(),
            source,
        })?;
    let (file_writer, worker) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(LoggingGuard {
        log_path: log_dir.join(LOG_FILE_NAME),
        _worker: worker,
    })
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::SaleConfig;

const DEFAULT_FILTER: &str = "info,tokensale_app=debug,tokensale_chain=debug,tokensale_core=debug";

/// The installed logging setup. Keep it alive until the process exits so the
/// file writer can flush.
pub struct Logging {
    log_dir: Option<PathBuf>,
    file_error: Option<String>,
    _guard: Option<WorkerGuard>,
}

impl Logging {
    /// Directory of the rolling log file, if file logging is active.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Why file logging was skipped, when it was.
    pub fn file_error(&self) -> Option<&str> {
        self.file_error.as_deref()
    }
}

/// Log to `~/.tokensale/logs` and stderr. If the log file cannot be opened,
/// logs go to stderr only and the reason is reported there.
pub fn init_logging() -> Logging {
    install(SaleConfig::logs_dir(), DEFAULT_FILTER)
}

/// Same as [`init_logging`] with an explicit directory and filter.
/// Used by tests that must not touch `~/.tokensale/logs`.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Logging {
    install(Ok(logs_dir.to_path_buf()), filter)
}

fn open_log_file(logs_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("cannot create log directory {}", logs_dir.display()))?;
    // Daily rotation
    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("tokensale")
        .build(logs_dir)
        .with_context(|| format!("cannot open log file in {}", logs_dir.display()))?;
    Ok(tracing_appender::non_blocking(file_appender))
}

fn install(logs_dir: Result<PathBuf>, filter: &str) -> Logging {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let opened = logs_dir.and_then(|dir| open_log_file(&dir).map(|file| (dir, file)));
    let (log_dir, file_error, guard, file_layer) = match opened {
        Ok((dir, (writer, guard))) => {
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);
            (Some(dir), None, Some(guard), Some(layer))
        }
        Err(e) => (None, Some(format!("{e:#}")), None, None),
    };

    // Only the first subscriber in a process wins; later calls keep the
    // existing one.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console)
        .try_init();

    if let Some(reason) = &file_error {
        warn!("file logging disabled: {reason}");
    }

    Logging {
        log_dir,
        file_error,
        _guard: guard,
    }
}

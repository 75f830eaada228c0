use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{self, LoggingSettings};

/// Route `tracing` output to a daily rolling file; the terminal belongs to the TUI.
///
/// Filter precedence: `--log-filter`, then `RUST_LOG`, then `logging.filter`.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(settings: &LoggingSettings, cli_filter: Option<&str>) -> Result<WorkerGuard> {
    let dir = settings
        .directory
        .clone()
        .or_else(config::default_log_dir)
        .unwrap_or_else(|| std::env::temp_dir().join("cadenza"));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&dir, "cadenza.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = match cli_filter {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(settings.filter_or_default())?,
        },
    };

    tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!(e))?;

    tracing::info!(dir = %dir.display(), "logging initialised");
    Ok(guard)
}

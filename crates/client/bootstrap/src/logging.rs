//! Tracing subscriber setup shared by the binaries.
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;

/// Install the global subscriber: stderr always, plus a log file when
/// configured.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn setup_logging(config: &LogConfig, app_name: &str) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if !config.file_logging() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
        return Ok(None);
    }

    let log_dir = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => default_log_dir(app_name)?,
    };
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_name = format!("{}.log", app_name);
    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Log file: {}", log_dir.join(file_name).display());
    Ok(Some(guard))
}

/// Platform data directory, e.g. `~/.local/share/patreon/logs` on Linux.
fn default_log_dir(app_name: &str) -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", app_name)
        .ok_or_else(|| anyhow!("Could not determine a data directory"))?;
    Ok(dirs.data_dir().join("logs"))
}

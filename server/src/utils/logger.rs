//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production environments.
//! Daily rotating file logs are deleted after 14 days.

use std::fs;
use std::path::{Path, PathBuf};

/// How long rotated log files are kept
const LOG_RETENTION_DAYS: i64 = 14;

/// Rolling file prefix; tracing-appender produces `waypoint-server.YYYY-MM-DD`
const LOG_FILE_PREFIX: &str = "waypoint-server";

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::INFO))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // Add file output if log_dir is provided
    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, LOG_FILE_PREFIX);
            subscriber.with_writer(file_appender).init();
            tokio::spawn(periodic_cleanup(log_path.to_path_buf()));
            return;
        }
    }

    subscriber.init();
}

/// Clean up rotated log files older than [`LOG_RETENTION_DAYS`]
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(LOG_RETENTION_DAYS);

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Match waypoint-server.YYYY-MM-DD
        if let Some(date_part) = name.strip_prefix(&format!("{LOG_FILE_PREFIX}."))
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(())
}

/// Hourly cleanup task spawned alongside file logging
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;

        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

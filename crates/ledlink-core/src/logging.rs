//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

const LOG_FILE_NAME: &str = "ledlink.log";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/ledlink/logs/` (platform data dir).
/// Log level is controlled by the `LEDLINK_LOG` environment variable.
///
/// # Examples
/// ```bash
/// LEDLINK_LOG=debug ledlink fill 255 0 0
/// LEDLINK_LOG=ledlink_device=trace ledlink info
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    let env_filter = EnvFilter::try_from_env("LEDLINK_LOG").unwrap_or_else(|_| {
        EnvFilter::new("ledlink=info,ledlink_device=info,ledlink_app=info,warn")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("ledlink starting, log directory: {}", log_dir.display());

    Ok(())
}

/// Directory the daily log files are written to
pub fn log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("ledlink").join("logs")
}

//! Notify-Tray: a system-tray demo host for notify-tray-core.

mod app;
mod config;
mod error;

pub(crate) use {
    app::App,
    error::{AppError, Result as AppResult},
};

use crate::config::{Config, LoggingConfig};

use tracing::{error, warn};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "notify-tray";
const LOG_FILE_SUFFIX: &str = "log";

/// Application entry point.
fn main() {
    let config = Config::load();
    let logging = config
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    let log_guard = init_logging(&logging);

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    // The tray registry is !Send, so everything runs on this thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(App::new(config).run());
    drop(log_guard);

    if let Err(e) = result {
        eprintln!("notify-tray: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber: stdout always, plus a daily file when a
/// log directory is configured. `RUST_LOG` overrides the configured filter.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let stdout = fmt::layer();

    let Some(directory) = &logging.directory else {
        tracing_subscriber::registry().with(filter).with(stdout).init();
        return None;
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(directory);

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .with(file)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry().with(filter).with(stdout).init();
            warn!(
                directory = ?directory,
                error = %e,
                "Log file unavailable, logging to stdout only"
            );
            None
        }
    }
}

//! Tracing setup for applications embedding the kernel.

use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use modlife_config::{ConfigLoader, LoggingConfig};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. With a log
/// directory configured, events are also written to daily rolling files;
/// the returned guard must be kept alive for as long as logging should
/// reach those files.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let (file_layer, guard) = match log_directory(config) {
        Some(directory) => {
            fs::create_dir_all(&directory)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(&config.file_prefix)
                .max_log_files(30)
                .build(&directory)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer, human-readable or JSON lines
        .with((!config.json).then(|| fmt::layer().with_target(true)))
        .with(config.json.then(|| fmt::layer().json()))
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// The configured log directory with `~` expanded.
fn log_directory(config: &LoggingConfig) -> Option<PathBuf> {
    config
        .directory
        .as_ref()
        .map(|directory| PathBuf::from(ConfigLoader::expand_path(&directory.to_string_lossy())))
}

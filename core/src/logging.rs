use std::path::Path;

use imf_utils::error::FileIOError;
use tracing::info;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
	filter::LevelFilter,
	fmt::{self, Layer},
	prelude::*,
	util::TryInitError,
	EnvFilter,
};

pub const DEFAULT_LOG_FILTER: &str = "warn,imf_core=debug,imf_actors=info,imf_images=info";

const LOG_FILE_PREFIX: &str = "image-field.log";

#[cfg(debug_assertions)]
const CONSOLE_LOG_FILTER: LevelFilter = LevelFilter::DEBUG;

#[cfg(not(debug_assertions))]
const CONSOLE_LOG_FILTER: LevelFilter = LevelFilter::INFO;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("a global tracing subscriber is already set: {0}")]
	Init(#[from] TryInitError),
}

/// Installs the global subscriber: console output plus daily rotated files under `logs_dir`.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Keep the returned guard alive for as long as
/// logs should be flushed to disk.
pub fn init_logger(logs_dir: impl AsRef<Path>) -> Result<WorkerGuard, LoggerError> {
	let logs_dir = logs_dir.as_ref();

	std::fs::create_dir_all(logs_dir)
		.map_err(|e| FileIOError::from((logs_dir, e, "Failed to create logs directory")))?;

	let (non_blocking, guard) =
		tracing_appender::non_blocking(rolling::daily(logs_dir, LOG_FILE_PREFIX));

	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
		)
		.with(fmt::layer().with_filter(CONSOLE_LOG_FILTER))
		.with(
			Layer::default()
				.with_writer(non_blocking)
				.with_ansi(false)
				.with_filter(LevelFilter::DEBUG),
		)
		.try_init()?;

	info!(logs_dir = %logs_dir.display(), "Logger initialized");

	Ok(guard)
}

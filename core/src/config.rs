use crate::{error::ValidationError, validation::MimePattern};

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use imf_utils::error::FileIOError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::instrument;

pub const DEFAULT_MAX_IMAGES: usize = 5;
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 1024 * 1024;

const fn default_max_images() -> usize {
	DEFAULT_MAX_IMAGES
}

const fn default_max_image_size() -> u64 {
	DEFAULT_MAX_IMAGE_SIZE
}

/// How one image field behaves. Stored as JSON when it lives on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFieldConfig {
	/// Name the parent form knows this field by.
	pub name: String,
	/// Prefix of every persisted key of this field.
	pub storage_key: String,
	#[serde(default = "default_max_images")]
	pub max_images: usize,
	/// In bytes.
	#[serde(default = "default_max_image_size")]
	pub max_image_size: u64,
	/// Matched against mime subtypes, `png` for `image/png`.
	#[serde(default)]
	pub allowed_types: MimePattern,
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("failed to (de)serialize image field config: {0}")]
	Serde(#[from] serde_json::Error),
	#[error("invalid image field config: {0}")]
	Invalid(&'static str),
	#[error(transparent)]
	Validation(#[from] ValidationError),
}

impl ImageFieldConfig {
	pub fn new(name: impl Into<String>, storage_key: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			storage_key: storage_key.into(),
			max_images: DEFAULT_MAX_IMAGES,
			max_image_size: DEFAULT_MAX_IMAGE_SIZE,
			allowed_types: MimePattern::default(),
		}
	}

	#[must_use]
	pub const fn with_max_images(mut self, max_images: usize) -> Self {
		self.max_images = max_images;
		self
	}

	#[must_use]
	pub const fn with_max_image_size(mut self, max_image_size: u64) -> Self {
		self.max_image_size = max_image_size;
		self
	}

	pub fn with_allowed_types(mut self, pattern: &str) -> Result<Self, ConfigError> {
		self.allowed_types = MimePattern::new(pattern)?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.name.is_empty() {
			return Err(ConfigError::Invalid("name must not be empty"));
		}

		if self.storage_key.is_empty()
			|| self
				.storage_key
				.split('/')
				.any(|segment| segment.is_empty() || segment == "." || segment == "..")
		{
			return Err(ConfigError::Invalid(
				"storage key must be made of non empty, non relative segments",
			));
		}

		if self.max_images == 0 {
			return Err(ConfigError::Invalid("max images must be at least 1"));
		}

		if self.max_image_size == 0 {
			return Err(ConfigError::Invalid("max image size must be at least 1 byte"));
		}

		Ok(())
	}

	#[instrument(err)]
	pub async fn load(path: &Path) -> Result<Self, ConfigError> {
		let bytes = fs::read(path)
			.await
			.map_err(|e| FileIOError::from((path, e, "Failed to read image field config")))?;

		let config = serde_json::from_slice::<Self>(&bytes)?;
		config.validate()?;

		Ok(config)
	}

	#[instrument(skip(self), err)]
	pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| FileIOError::from((parent, e)))?;
		}

		fs::write(path, serde_json::to_vec_pretty(self)?)
			.await
			.map_err(|e| FileIOError::from((path, e, "Failed to write image field config")).into())
	}
}

/// Where fields are persisted when the embedder doesn't pick a directory.
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
	ProjectDirs::from("", "", "image-field").map(|dirs| dirs.data_local_dir().to_path_buf())
}

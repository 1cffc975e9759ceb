use super::{KeyValueStore, StoreError};

use std::{
	io,
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use imf_utils::error::{report_error, FileIOError};
use tokio::fs;
use tracing::{instrument, trace};
use uuid::Uuid;

const VALUE_EXTENSION: &str = "bin";

/// Durable backend, one file per key under `root`.
///
/// A key's `/`-separated segments become directories, so `profile/avatar/slots` ends up in
/// `<root>/profile/avatar/slots.bin`. Writes go to a temporary sibling first and are renamed
/// into place, so readers see either the old or the new value.
#[derive(Debug, Clone)]
pub struct DiskStore {
	root: PathBuf,
}

impl DiskStore {
	pub async fn open(root: impl AsRef<Path> + Send) -> Result<Self, StoreError> {
		let root = root.as_ref();

		fs::create_dir_all(root)
			.await
			.map_err(|e| FileIOError::from((root, e, "Failed to create store directory")))?;

		Ok(Self { root: root.into() })
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
		let mut path = self.root.clone();
		let mut segments = key.split('/').peekable();

		while let Some(segment) = segments.next() {
			if segment.is_empty()
				|| segment == "."
				|| segment == ".."
				|| segment.contains(['\\', '\0'])
			{
				return Err(StoreError::InvalidKey(key.to_string()));
			}

			if segments.peek().is_some() {
				path.push(segment);
			} else {
				path.push(format!("{segment}.{VALUE_EXTENSION}"));
			}
		}

		Ok(path)
	}
}

#[async_trait]
impl KeyValueStore for DiskStore {
	#[instrument(skip(self), err)]
	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
		let path = self.path_for(key)?;

		match fs::read(&path).await {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(FileIOError::from((path, e)).into()),
		}
	}

	#[instrument(skip(self, value), fields(size = value.len()), err)]
	async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
		let path = self.path_for(key)?;

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| FileIOError::from((parent, e, "Failed to create key directory")))?;
		}

		let temp_path = path.with_extension(format!("{VALUE_EXTENSION}.{}.tmp", Uuid::new_v4()));

		fs::write(&temp_path, value)
			.await
			.map_err(|e| FileIOError::from((&temp_path, e)))?;

		if let Err(e) = fs::rename(&temp_path, &path).await {
			report_error(
				&fs::remove_file(&temp_path)
					.await
					.map_err(|e| FileIOError::from((&temp_path, e, "Failed to clean up temp file"))),
			);

			return Err(FileIOError::from((path, e, "Failed to move value into place")).into());
		}

		trace!("Value persisted");

		Ok(())
	}

	#[instrument(skip(self), err)]
	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		let path = self.path_for(key)?;

		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(FileIOError::from((path, e)).into()),
		}
	}
}

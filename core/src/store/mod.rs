//! Durable key-value persistence for image fields.
//!
//! [`KeyValueStore`] is the raw byte-level backend ([`DiskStore`] in production,
//! [`MemoryStore`] for ephemeral fields and tests). [`PersistentStore`] layers typed
//! MessagePack values on top of it, and [`FieldRepository`] owns the per-field layout.

use crate::{
	config::default_data_dir,
	error::{Error, Result},
};

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use imf_utils::error::FileIOError;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{instrument, trace};

mod disk;
mod keys;
mod legacy;
mod memory;
mod repository;

pub use disk::DiskStore;
pub use keys::FieldKeys;
pub use memory::MemoryStore;
pub use repository::FieldRepository;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("invalid store key <key='{0}'>")]
	InvalidKey(String),
	#[error("failed to encode value: {0}")]
	Encode(#[from] rmp_serde::encode::Error),
	#[error("failed to decode value: {0}")]
	Decode(#[from] rmp_serde::decode::Error),
	#[error("store backend failure: {0}")]
	Backend(String),
	#[error("no per-user data directory to keep image fields in")]
	NoDataDir,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
	/// `Ok(None)` when nothing was ever written under `key`.
	async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError>;

	async fn set(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), StoreError>;

	/// Deleting an absent key is not an error.
	async fn delete(&self, key: &str) -> std::result::Result<(), StoreError>;
}

/// Typed view over a [`KeyValueStore`], cheap to clone.
#[derive(Clone)]
pub struct PersistentStore {
	backend: Arc<dyn KeyValueStore>,
}

impl PersistentStore {
	pub fn new(backend: impl KeyValueStore) -> Self {
		Self {
			backend: Arc::new(backend),
		}
	}

	#[must_use]
	pub fn in_memory() -> Self {
		Self::new(MemoryStore::default())
	}

	pub async fn open(root: impl AsRef<Path> + Send) -> Result<Self> {
		let root = root.as_ref();

		DiskStore::open(root)
			.await
			.map(Self::new)
			.map_err(|source| Error::CacheWrite {
				key: root.display().to_string(),
				source,
			})
	}

	/// Opens a [`DiskStore`] under [`default_data_dir`].
	pub async fn open_default() -> Result<Self> {
		let root = default_data_dir().ok_or_else(|| Error::CacheWrite {
			key: String::new(),
			source: StoreError::NoDataDir,
		})?;

		Self::open(root).await
	}

	#[instrument(skip(self), err)]
	pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
		let read_err = |source: StoreError| Error::CacheRead {
			key: key.to_string(),
			source,
		};

		let Some(bytes) = self.backend.get(key).await.map_err(read_err)? else {
			trace!("Cache miss");
			return Ok(None);
		};

		rmp_serde::from_slice(&bytes)
			.map(Some)
			.map_err(|e| read_err(e.into()))
	}

	#[instrument(skip(self, value), err)]
	pub async fn set<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
		let write_err = |source: StoreError| Error::CacheWrite {
			key: key.to_string(),
			source,
		};

		let bytes = rmp_serde::to_vec_named(value).map_err(|e| write_err(e.into()))?;

		trace!(size = bytes.len(), "Writing value");

		self.backend.set(key, bytes).await.map_err(write_err)
	}

	#[instrument(skip(self), err)]
	pub async fn delete(&self, key: &str) -> Result<()> {
		self.backend
			.delete(key)
			.await
			.map_err(|source| Error::CacheWrite {
				key: key.to_string(),
				source,
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::slot::{ImageBlob, ImageSlot};

	use tracing_test::traced_test;

	#[tokio::test]
	#[traced_test]
	async fn set_then_get_returns_the_same_value() {
		let store = PersistentStore::in_memory();
		let slots = vec![
			ImageSlot::from_file(ImageBlob::new_file("a.png", "image/png", vec![1, 2, 3])),
			ImageSlot::from_file(ImageBlob::new_file("b.gif", "image/gif", vec![4, 5])),
		];

		store.set("field/slots", &slots).await.unwrap();

		assert_eq!(
			store.get::<Vec<ImageSlot>>("field/slots").await.unwrap(),
			Some(slots)
		);
	}

	#[tokio::test]
	async fn missing_key_is_none() {
		let store = PersistentStore::in_memory();

		assert_eq!(store.get::<Vec<String>>("nope").await.unwrap(), None);
	}

	#[tokio::test]
	async fn undecodable_value_is_a_read_error() {
		let store = PersistentStore::in_memory();
		store.set("field/fileNames", &42_u32).await.unwrap();

		let err = store
			.get::<Vec<String>>("field/fileNames")
			.await
			.unwrap_err();

		assert!(
			matches!(err, Error::CacheRead { ref key, source: StoreError::Decode(_) } if key == "field/fileNames")
		);
	}

	#[tokio::test]
	async fn delete_removes_value() {
		let store = PersistentStore::in_memory();
		store.set("k", "v").await.unwrap();
		store.delete("k").await.unwrap();
		store.delete("k").await.unwrap();

		assert_eq!(store.get::<String>("k").await.unwrap(), None);
	}
}

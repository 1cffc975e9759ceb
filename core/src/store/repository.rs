use super::{legacy, FieldKeys, PersistentStore};

use crate::{error::Result, slot::ImageSlot};

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

/// Loads and saves whole image fields.
///
/// Every read-modify-write of a field goes through [`FieldRepository::update`], which holds a
/// per-storage-key lock for its whole duration. Fields with different storage keys never wait
/// on each other.
#[derive(Clone)]
pub struct FieldRepository {
	store: PersistentStore,
	locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FieldRepository {
	#[must_use]
	pub fn new(store: PersistentStore) -> Self {
		Self {
			store,
			locks: Arc::default(),
		}
	}

	#[must_use]
	pub const fn store(&self) -> &PersistentStore {
		&self.store
	}

	async fn field_lock(&self, storage_key: &str) -> Arc<Mutex<()>> {
		Arc::clone(
			self.locks
				.lock()
				.await
				.entry(storage_key.to_string())
				.or_default(),
		)
	}

	/// Slots of a field, empty if it was never written.
	#[instrument(skip(self), err)]
	pub async fn load(&self, storage_key: &str) -> Result<Vec<ImageSlot>> {
		let lock = self.field_lock(storage_key).await;
		let _guard = lock.lock().await;

		self.load_unlocked(&FieldKeys::new(storage_key)).await
	}

	/// Applies `f` to the field's slots and writes them back once, all under the field lock.
	///
	/// Nothing is written if `f` fails.
	#[instrument(skip(self, f), err)]
	pub async fn update<R>(
		&self,
		storage_key: &str,
		f: impl FnOnce(&mut Vec<ImageSlot>) -> Result<R> + Send,
	) -> Result<R> {
		let lock = self.field_lock(storage_key).await;
		let _guard = lock.lock().await;

		let keys = FieldKeys::new(storage_key);
		let mut slots = self.load_unlocked(&keys).await?;

		let out = f(&mut slots)?;

		self.store.set(&keys.slots(), &slots).await?;

		trace!(len = slots.len(), "Field saved");

		Ok(out)
	}

	/// Overwrites the whole field.
	pub async fn save(&self, storage_key: &str, slots: Vec<ImageSlot>) -> Result<()> {
		self.update(storage_key, move |current| {
			*current = slots;
			Ok(())
		})
		.await
	}

	async fn load_unlocked(&self, keys: &FieldKeys) -> Result<Vec<ImageSlot>> {
		if let Some(slots) = self.store.get(&keys.slots()).await? {
			return Ok(slots);
		}

		let Some(slots) = legacy::load(&self.store, keys).await? else {
			return Ok(vec![]);
		};

		// Slot ids are minted while upgrading, they must be the same on every later read.
		self.store.set(&keys.slots(), &slots).await?;

		debug!(len = slots.len(), "Upgraded legacy field");

		Ok(slots)
	}
}

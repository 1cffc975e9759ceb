//! Reads fields persisted as five parallel arrays, before slots were stored as one record
//! collection. Nothing here ever writes or deletes those keys.

use super::{FieldKeys, PersistentStore};

use crate::{
	error::Result,
	slot::{ImageBlob, ImageSlot, Orientation, Quality, SlotId},
};

use tracing::{debug, warn};

pub(super) async fn load(
	store: &PersistentStore,
	keys: &FieldKeys,
) -> Result<Option<Vec<ImageSlot>>> {
	let originals = store
		.get::<Vec<Option<ImageBlob>>>(&keys.original_files())
		.await?;
	let modified = store
		.get::<Vec<Option<ImageBlob>>>(&keys.modified_files())
		.await?;
	let names = store.get::<Vec<String>>(&keys.file_names()).await?;

	if originals.is_none() && modified.is_none() && names.is_none() {
		return Ok(None);
	}

	let qualities = store
		.get::<Vec<i64>>(&keys.qualities())
		.await?
		.unwrap_or_default();
	let orientations = store
		.get::<Vec<i64>>(&keys.orientations())
		.await?
		.unwrap_or_default();

	let originals = originals.unwrap_or_default();
	let modified = modified.unwrap_or_default();
	let names = names.unwrap_or_default();

	let len = originals.len().max(modified.len()).max(names.len());

	debug!(
		storage_key = keys.storage_key(),
		len, "Upgrading legacy parallel arrays into slots"
	);

	let slots = (0..len)
		.map(|i| {
			let original = originals.get(i).cloned().flatten();
			let modified = modified.get(i).cloned().flatten();

			let file_name = names
				.get(i)
				.cloned()
				.or_else(|| {
					original
						.as_ref()
						.or(modified.as_ref())
						.and_then(|blob| blob.file_name.clone())
				})
				.unwrap_or_default();

			ImageSlot {
				id: SlotId::new_v4(),
				original,
				modified,
				file_name,
				quality: legacy_value(&qualities, i, Quality::new, "quality"),
				orientation: legacy_value(&orientations, i, Orientation::new, "orientation"),
				revision: 0,
			}
		})
		.collect();

	Ok(Some(slots))
}

fn legacy_value<T: Default, E>(
	values: &[i64],
	index: usize,
	parse: impl FnOnce(i64) -> std::result::Result<T, E>,
	what: &str,
) -> T {
	values.get(index).map_or_else(T::default, |&value| {
		parse(value).unwrap_or_else(|_| {
			warn!(index, value, "Out of range legacy {what}, using the default");
			T::default()
		})
	})
}

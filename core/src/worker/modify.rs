use crate::{
	codec::{CodecOptions, ImageCodec},
	error::{Error, InvariantViolation, Result},
	form::FormEntry,
	slot::{ImageBlob, Orientation, Projections, Quality, SlotId},
	store::FieldRepository,
	validation::{validate_images, MimePattern},
};

use std::sync::Arc;

use imf_actors::Worker;
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyRequest {
	pub storage_key: String,
	pub slot_id: SlotId,
	/// Where the foreground saw the slot when it asked, only used for logging.
	pub current_image_index: usize,
	pub quality: Quality,
	pub orientation: Orientation,
	/// Monotonic per slot, a response for an older revision is stale.
	pub revision: u64,
	pub max_images_amount: usize,
	pub max_image_size: u64,
	pub allowed_types: MimePattern,
}

/// Full snapshot of the field after a successful modification.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedImage {
	pub slot_id: SlotId,
	/// Position of the slot at write time.
	pub current_image_index: usize,
	pub revision: u64,
	pub quality: Quality,
	pub orientation: Orientation,
	pub file_blob: FormEntry,
	pub file_names: Vec<String>,
	pub updated_modified_files: Vec<Option<ImageBlob>>,
	pub are_images_invalid: Vec<bool>,
}

/// A modification outcome, tagged with what it was for even when it failed.
#[derive(Debug)]
pub struct ModifyResponse {
	pub slot_id: SlotId,
	pub revision: u64,
	pub result: Result<ModifiedImage>,
}

/// Re-encodes a slot's original with a new quality and orientation, then persists it.
///
/// The codec runs without holding the field lock. The slot is looked up again once the
/// transform is done, so a slot removed meanwhile or a newer revision that already landed make
/// this modification fail instead of overwriting anything.
#[instrument(
	skip(repository, codec, request),
	fields(
		storage_key = %request.storage_key,
		slot_id = %request.slot_id,
		index = request.current_image_index,
		revision = request.revision,
	),
	err
)]
pub async fn modify_image(
	repository: &FieldRepository,
	codec: &dyn ImageCodec,
	request: ModifyRequest,
) -> Result<ModifiedImage> {
	let ModifyRequest {
		storage_key,
		slot_id,
		quality,
		orientation,
		revision,
		max_image_size,
		allowed_types,
		..
	} = request;

	let original = {
		let slots = repository.load(&storage_key).await?;
		let slot = slots
			.iter()
			.find(|slot| slot.id == slot_id)
			.ok_or(InvariantViolation::SlotNotFound(slot_id))?;

		check_revision(slot_id, revision, slot.revision)?;

		slot.original
			.clone()
			.ok_or(InvariantViolation::MissingOriginal(slot_id))?
	};

	let transformed = codec
		.transform(
			original,
			CodecOptions {
				quality,
				orientation,
			},
		)
		.await?;

	trace!(size = transformed.size(), "Transformed original");

	let (current_image_index, file_name, updated_modified_files, file_names) = repository
		.update(&storage_key, |slots| {
			let (index, slot) = slots
				.iter_mut()
				.enumerate()
				.find(|(_, slot)| slot.id == slot_id)
				.ok_or(InvariantViolation::SlotNotFound(slot_id))?;

			check_revision(slot_id, revision, slot.revision)?;

			slot.modified = Some(transformed.clone());
			slot.quality = quality;
			slot.orientation = orientation;
			slot.revision = revision;

			let file_name = slot.file_name.clone();

			Ok((
				index,
				file_name,
				slots.modified_files(),
				slots.file_names(),
			))
		})
		.await?;

	let are_images_invalid = validate_images(
		updated_modified_files.iter().map(Option::as_ref),
		max_image_size,
		&allowed_types,
	);

	debug!(?are_images_invalid, "Modification persisted");

	Ok(ModifiedImage {
		slot_id,
		current_image_index,
		revision,
		quality,
		orientation,
		file_blob: FormEntry {
			file_name: transformed.file_name.clone().unwrap_or(file_name),
			blob: transformed,
		},
		file_names,
		updated_modified_files,
		are_images_invalid,
	})
}

fn check_revision(slot_id: SlotId, revision: u64, stored_revision: u64) -> Result<()> {
	if stored_revision > revision {
		return Err(InvariantViolation::StaleRevision {
			slot_id,
			revision,
			stored_revision,
		}
		.into());
	}

	Ok(())
}

/// Runs codec transforms off the foreground.
pub struct ModificationWorker {
	repository: FieldRepository,
	codec: Arc<dyn ImageCodec>,
	in_flight: Option<(SlotId, u64)>,
}

impl ModificationWorker {
	#[must_use]
	pub fn new(repository: FieldRepository, codec: Arc<dyn ImageCodec>) -> Self {
		Self {
			repository,
			codec,
			in_flight: None,
		}
	}
}

impl Worker for ModificationWorker {
	const NAME: &'static str = "modify_images";

	type Request = ModifyRequest;
	type Response = ModifyResponse;

	async fn handle(&mut self, request: Self::Request) -> Self::Response {
		let (slot_id, revision) = (request.slot_id, request.revision);
		self.in_flight = Some((slot_id, revision));

		let result = modify_image(&self.repository, self.codec.as_ref(), request).await;

		self.in_flight = None;

		ModifyResponse {
			slot_id,
			revision,
			result,
		}
	}

	fn on_panic(&self, reason: String) -> Self::Response {
		let (slot_id, revision) = self.in_flight.unwrap_or_default();

		ModifyResponse {
			slot_id,
			revision,
			result: Err(Error::Unknown(reason)),
		}
	}
}

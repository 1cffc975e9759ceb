use super::{raw_index, ImageField, InvalidKind, ParentAction};

use crate::{
	error::{Error, InvariantViolation, Result, ValidationError},
	slot::{ImageBlob, ImageSlot, Orientation, Quality, SlotId},
	state::{slot_index, Action, SlotView},
	validation::{is_image_invalid, validate_images},
	worker::{
		modify_image, retrieve_images, ModifiedImage, ModifyRequest, ModifyResponse,
		RetrieveRequest, RetrieveResponse,
	},
};

use std::iter;

use tracing::{debug, instrument, trace};

type ParentChanges = Vec<(InvalidKind, String)>;

impl ImageField {
	/// Starts loading the persisted slots, on the retrieval worker when there is one.
	#[instrument(skip(self), fields(field = %self.config.name))]
	pub async fn mount(&self) -> Result<()> {
		let res = self.mount_inner().await;
		self.report(res)
	}

	/// Applies a retrieval result to the foreground and tells the parent what is valid.
	#[instrument(skip_all, fields(field = %self.config.name))]
	pub async fn handle_retrieve_images_message(&self, response: RetrieveResponse) -> Result<()> {
		let res = self.retrieve_images_message_inner(response).await;
		self.report(res)
	}

	/// Appends freshly picked files as new slots, persisting them first.
	#[instrument(skip_all, fields(field = %self.config.name, files = files.len()))]
	pub async fn handle_file_input_change(&self, files: Vec<ImageBlob>) -> Result<()> {
		let res = self.file_input_change_inner(files).await;
		self.report(res)
	}

	/// Optimistically shows the new quality and orientation, then asks for the transform.
	#[instrument(skip(self), fields(field = %self.config.name))]
	pub async fn handle_image_quality_orientation_slider_change(
		&self,
		index: i64,
		quality: i64,
		orientation: i64,
	) -> Result<()> {
		let res = self
			.slider_change_inner(index, quality, orientation)
			.await;
		self.report(res)
	}

	/// Applies a modification result, unless a newer one was requested since.
	#[instrument(
		skip_all,
		fields(field = %self.config.name, slot_id = %response.slot_id, revision = response.revision)
	)]
	pub async fn handle_modify_images_message(&self, response: ModifyResponse) -> Result<()> {
		let res = self.modify_images_message_inner(response).await;
		self.report(res)
	}

	#[instrument(skip(self), fields(field = %self.config.name))]
	pub async fn handle_reset_image_click(&self, index: i64) -> Result<()> {
		let res = self.reset_image_click_inner(index).await;
		self.report(res)
	}

	#[instrument(skip(self), fields(field = %self.config.name))]
	pub async fn handle_remove_image_click(&self, index: i64) -> Result<()> {
		let res = self.remove_image_click_inner(index).await;
		self.report(res)
	}

	pub fn toggle_modal(&self, is_modal_open: bool) -> Result<()> {
		let res = self.liveness.ensure_mounted().map(|()| {
			self.dispatch(Action::SetIsModalOpen { is_modal_open });
		});
		self.report(res)
	}

	async fn mount_inner(&self) -> Result<()> {
		self.liveness.ensure_mounted()?;

		self.dispatch(Action::SetIsLoading { is_loading: true });

		let request = RetrieveRequest {
			storage_key: self.config.storage_key.clone(),
			max_images: self.config.max_images,
		};

		if let Some(workers) = &self.workers {
			let res = self
				.liveness
				.guard(async { workers.retrieve.post(request).await.map_err(Error::from) })
				.await;

			if matches!(&res, Err(e) if !e.is_unmounted()) {
				self.dispatch(Action::SetIsLoading { is_loading: false });
			}

			return res;
		}

		let response = retrieve_images(&self.repository, request).await;

		self.retrieve_images_message_inner(response).await
	}

	async fn retrieve_images_message_inner(&self, response: RetrieveResponse) -> Result<()> {
		self.liveness.ensure_mounted()?;

		let retrieved = match response.and_then(|retrieved| {
			if retrieved.slots.len() > self.config.max_images {
				Err(ValidationError::TooManyImages {
					max: self.config.max_images,
					attempted: retrieved.slots.len(),
				}
				.into())
			} else {
				Ok(retrieved)
			}
		}) {
			Ok(retrieved) => retrieved,
			Err(e) => {
				self.dispatch(Action::SetIsLoading { is_loading: false });
				return Err(e);
			}
		};

		let is_errors = validate_images(
			retrieved.slots.iter().map(|slot| slot.modified.as_ref()),
			self.config.max_image_size,
			&self.config.allowed_types,
		);

		let mut slots = retrieved
			.slots
			.into_iter()
			.zip(is_errors)
			.map(|(slot, is_error)| SlotView {
				is_error,
				..slot.into()
			})
			.collect::<Vec<_>>();

		let changes = slots
			.iter()
			.filter(|slot| slot.is_error)
			.map(|slot| (InvalidKind::IsError, slot.file_name.clone()))
			.collect::<ParentChanges>();

		// Files picked while the retrieval was in flight may be missing from what it read.
		let added_meanwhile = {
			let state = self.state_tx.borrow();
			state
				.slots
				.iter()
				.filter(|current| slots.iter().all(|slot| slot.id != current.id))
				.cloned()
				.collect::<Vec<_>>()
		};

		if !added_meanwhile.is_empty() {
			trace!(len = added_meanwhile.len(), "Keeping slots added while loading");
			slots.extend(added_meanwhile);
		}

		debug!(len = slots.len(), "Hydrating image field");

		self.dispatch(Action::Hydrate { slots });
		self.dispatch(Action::SetIsLoading { is_loading: false });

		self.notify_parent(changes).await
	}

	async fn file_input_change_inner(&self, files: Vec<ImageBlob>) -> Result<()> {
		self.liveness.ensure_mounted()?;

		if files.is_empty() {
			return Err(ValidationError::NoFiles.into());
		}

		let max = self.config.max_images;
		let attempted = self.state_tx.borrow().slots.len() + files.len();
		if attempted > max {
			return Err(ValidationError::TooManyImages { max, attempted }.into());
		}

		let new_slots = files
			.into_iter()
			.map(ImageSlot::from_file)
			.collect::<Vec<_>>();

		self.liveness
			.guard(self.repository.update(&self.config.storage_key, |slots| {
				let attempted = slots.len() + new_slots.len();
				if attempted > max {
					return Err(ValidationError::TooManyImages { max, attempted }.into());
				}

				slots.extend(new_slots.iter().cloned());

				Ok(())
			}))
			.await?;

		let mut changes = ParentChanges::with_capacity(new_slots.len());

		for ImageSlot {
			id,
			modified,
			file_name,
			..
		} in new_slots
		{
			let is_error = is_image_invalid(
				modified.as_ref(),
				self.config.max_image_size,
				&self.config.allowed_types,
			);

			self.dispatch(Action::AddImageFileBlob {
				slot_id: id,
				blob: modified,
			});
			self.dispatch(Action::AddFileName {
				index: -1,
				name: file_name.clone(),
			});

			if let Some((index, _)) = self.locate(id) {
				self.dispatch(Action::SetIsErrors {
					index: raw_index(index),
					is_error,
				});
			}

			changes.push((validity_kind(is_error), file_name));
		}

		self.notify_parent(changes).await
	}

	async fn slider_change_inner(&self, index: i64, quality: i64, orientation: i64) -> Result<()> {
		self.liveness.ensure_mounted()?;

		let quality = Quality::new(quality)?;
		let orientation = Orientation::new(orientation)?;
		let (position, slot_id, _) = self.slot_at(index)?;

		self.dispatch(Action::SetQuality {
			index,
			quality: quality.get().into(),
		});
		self.dispatch(Action::SetOrientation {
			index,
			orientation: orientation.get().into(),
		});
		self.dispatch(Action::BeginModification { index });

		let revision = self
			.locate(slot_id)
			.map(|(_, revision)| revision)
			.ok_or(InvariantViolation::SlotNotFound(slot_id))?;

		let request = ModifyRequest {
			storage_key: self.config.storage_key.clone(),
			slot_id,
			current_image_index: position,
			quality,
			orientation,
			revision,
			max_images_amount: self.config.max_images,
			max_image_size: self.config.max_image_size,
			allowed_types: self.config.allowed_types.clone(),
		};

		if let Some(workers) = &self.workers {
			trace!(revision, "Posting modification to the worker");

			let res = self
				.liveness
				.guard(async { workers.modify.post(request).await.map_err(Error::from) })
				.await;

			if matches!(&res, Err(e) if !e.is_unmounted()) {
				self.finish_modification(slot_id, revision);
			}

			return res;
		}

		let result = modify_image(&self.repository, self.codec.as_ref(), request).await;

		self.modify_images_message_inner(ModifyResponse {
			slot_id,
			revision,
			result,
		})
		.await
	}

	async fn modify_images_message_inner(&self, response: ModifyResponse) -> Result<()> {
		self.liveness.ensure_mounted()?;

		let ModifyResponse {
			slot_id,
			revision,
			result,
		} = response;

		let Some((index, latest_revision)) = self.locate(slot_id) else {
			debug!("Image was removed meanwhile, dropping modification result");
			return Ok(());
		};

		if revision < latest_revision {
			debug!(latest_revision, "Dropping stale modification result");
			return Ok(());
		}

		let modified = match result.and_then(check_modified) {
			Ok(modified) => modified,
			Err(Error::Invariant(InvariantViolation::SlotNotFound(_))) => {
				debug!("Image was removed from the store meanwhile, dropping modification result");
				self.finish_modification(slot_id, revision);
				return Ok(());
			}
			Err(e) => {
				self.finish_modification(slot_id, revision);
				return Err(e);
			}
		};

		let ModifiedImage {
			quality,
			orientation,
			file_blob,
			are_images_invalid,
			..
		} = modified;

		let index = raw_index(index);
		let previous = self.state_tx.borrow().is_errors();

		self.dispatch(Action::SetImageFileBlob {
			index,
			blob: file_blob.blob,
		});
		self.dispatch(Action::SetQuality {
			index,
			quality: quality.get().into(),
		});
		self.dispatch(Action::SetOrientation {
			index,
			orientation: orientation.get().into(),
		});

		// The worker's vector follows the persisted order, which only matches ours while
		// both have the same slots.
		let validity = if are_images_invalid.len() == previous.len() {
			are_images_invalid
		} else {
			let state = self.state_tx.borrow();
			validate_images(
				state.slots.iter().map(|slot| slot.blob.as_ref()),
				self.config.max_image_size,
				&self.config.allowed_types,
			)
		};

		for (i, is_error) in validity.into_iter().enumerate() {
			self.dispatch(Action::SetIsErrors {
				index: raw_index(i),
				is_error,
			});
		}

		self.dispatch(Action::FinishModification { index, revision });

		let changes = {
			let state = self.state_tx.borrow();
			state
				.slots
				.iter()
				.zip(previous.into_iter().chain(iter::repeat(false)))
				.filter(|(slot, was_error)| slot.is_error != *was_error)
				.map(|(slot, _)| (validity_kind(slot.is_error), slot.file_name.clone()))
				.collect::<ParentChanges>()
		};

		self.notify_parent(changes).await
	}

	async fn reset_image_click_inner(&self, index: i64) -> Result<()> {
		self.liveness.ensure_mounted()?;

		let (_, slot_id, _) = self.slot_at(index)?;

		self.dispatch(Action::BeginModification { index });

		let revision = self
			.locate(slot_id)
			.map(|(_, revision)| revision)
			.ok_or(InvariantViolation::SlotNotFound(slot_id))?;

		let res = self
			.liveness
			.guard(self.repository.update(&self.config.storage_key, |slots| {
				let slot = slots
					.iter_mut()
					.find(|slot| slot.id == slot_id)
					.ok_or(InvariantViolation::SlotNotFound(slot_id))?;

				let original = slot
					.original
					.clone()
					.ok_or(InvariantViolation::MissingOriginal(slot_id))?;

				slot.modified = Some(original.clone());
				slot.quality = Quality::default();
				slot.orientation = Orientation::default();
				slot.revision = revision;

				Ok(original)
			}))
			.await;

		let original = match res {
			Ok(original) => original,
			Err(e) => {
				if !e.is_unmounted() {
					self.finish_modification(slot_id, revision);
				}
				return Err(e);
			}
		};

		let Some((position, _)) = self.locate(slot_id) else {
			debug!("Image was removed meanwhile, nothing to reset");
			return Ok(());
		};

		let (was_error, file_name) = {
			let state = self.state_tx.borrow();
			let slot = &state.slots[position];
			(slot.is_error, slot.file_name.clone())
		};

		let is_error = is_image_invalid(
			Some(&original),
			self.config.max_image_size,
			&self.config.allowed_types,
		);

		let index = raw_index(position);

		self.dispatch(Action::ResetImageFileBlob {
			index,
			original: Some(original),
		});
		self.dispatch(Action::SetIsErrors { index, is_error });
		self.dispatch(Action::FinishModification { index, revision });

		let changes = if was_error == is_error {
			vec![]
		} else {
			vec![(validity_kind(is_error), file_name)]
		};

		self.notify_parent(changes).await
	}

	async fn remove_image_click_inner(&self, index: i64) -> Result<()> {
		self.liveness.ensure_mounted()?;

		let (_, slot_id, file_name) = self.slot_at(index)?;

		self.liveness
			.guard(self.repository.update(&self.config.storage_key, |slots| {
				slots.retain(|slot| slot.id != slot_id);
				Ok(())
			}))
			.await?;

		let Some((position, _)) = self.locate(slot_id) else {
			debug!("Image was already removed");
			return Ok(());
		};

		self.dispatch(Action::RemoveImageFileBlob {
			index: raw_index(position),
		});

		self.notify_parent(vec![(InvalidKind::Remove, file_name)])
			.await
	}

	/// Sends one `Invalid` action per change, then the bundle of every valid image.
	async fn notify_parent(&self, changes: ParentChanges) -> Result<()> {
		let actions = changes
			.into_iter()
			.map(|(kind, name)| ParentAction::Invalid { kind, name })
			.chain(iter::once(ParentAction::Valid {
				bundle: self.valid_bundle(),
			}));

		for action in actions {
			self.liveness.ensure_mounted()?;
			self.parent.send(action).await;
		}

		self.liveness.ensure_mounted()
	}

	/// Validates a raw index against the foreground slots.
	fn slot_at(&self, index: i64) -> Result<(usize, SlotId, String)> {
		let state = self.state_tx.borrow();
		let position = slot_index(index, state.slots.len())?;
		let slot = &state.slots[position];

		Ok((position, slot.id, slot.file_name.clone()))
	}
}

fn check_modified(modified: ModifiedImage) -> Result<ModifiedImage> {
	if modified.are_images_invalid.len() != modified.updated_modified_files.len()
		|| modified.file_names.len() != modified.updated_modified_files.len()
	{
		return Err(ValidationError::MalformedResult(
			"validity, file names and modified files must be index aligned",
		)
		.into());
	}

	Ok(modified)
}

const fn validity_kind(is_error: bool) -> InvalidKind {
	if is_error {
		InvalidKind::IsError
	} else {
		InvalidKind::NotError
	}
}

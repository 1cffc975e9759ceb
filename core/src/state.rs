//! Foreground view of an image field and the pure reducer driving it.
//!
//! Every [`Action`] is validated against the current state before being applied. Invalid
//! actions (negative or out of bounds indices, out of range qualities) leave the state
//! untouched; they are logged at `debug` and never surface as errors.

use crate::{
	error::ValidationError,
	slot::{ImageBlob, Orientation, Quality, SlotFields, SlotId},
	worker::RetrievedSlot,
};

use imf_actors::WorkerId;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
	pub id: SlotId,
	pub blob: Option<ImageBlob>,
	pub file_name: String,
	pub quality: Quality,
	pub orientation: Orientation,
	pub is_error: bool,
	/// A modification (or reset) for this slot is in flight.
	pub is_modifying: bool,
	/// Last revision handed out to a modification of this slot.
	pub latest_revision: u64,
}

impl SlotView {
	#[must_use]
	pub fn new(id: SlotId, blob: Option<ImageBlob>) -> Self {
		Self {
			id,
			blob,
			file_name: String::new(),
			quality: Quality::default(),
			orientation: Orientation::default(),
			is_error: false,
			is_modifying: false,
			latest_revision: 0,
		}
	}
}

impl From<RetrievedSlot> for SlotView {
	fn from(slot: RetrievedSlot) -> Self {
		Self {
			id: slot.id,
			blob: slot.modified,
			file_name: slot.file_name,
			quality: slot.quality,
			orientation: slot.orientation,
			is_error: false,
			is_modifying: false,
			latest_revision: slot.revision,
		}
	}
}

impl SlotFields for SlotView {
	fn file_name(&self) -> &str {
		&self.file_name
	}

	fn modified(&self) -> Option<&ImageBlob> {
		self.blob.as_ref()
	}

	fn quality(&self) -> Quality {
		self.quality
	}

	fn orientation(&self) -> Orientation {
		self.orientation
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageFieldState {
	pub slots: Vec<SlotView>,
	pub current_image_index: usize,
	pub is_loading: bool,
	pub is_modal_open: bool,
	pub retrieve_images_worker: Option<WorkerId>,
	pub modify_images_worker: Option<WorkerId>,
}

impl ImageFieldState {
	#[must_use]
	pub fn slot(&self, id: SlotId) -> Option<(usize, &SlotView)> {
		self.slots.iter().enumerate().find(|(_, slot)| slot.id == id)
	}

	#[must_use]
	pub fn is_errors(&self) -> Vec<bool> {
		self.slots.iter().map(|slot| slot.is_error).collect()
	}

	#[must_use]
	pub fn is_modifying(&self) -> bool {
		self.slots.iter().any(|slot| slot.is_modifying)
	}

	/// Applies `action` in place, or leaves the state as is if it doesn't validate.
	pub fn apply(&mut self, action: Action) {
		let tag = action.tag();

		match action.validate(self) {
			Ok(action) => {
				trace!(action = tag, "Applying action");
				self.apply_validated(action);
			}
			Err(e) => debug!(action = tag, %e, "Discarding invalid action"),
		}
	}

	fn apply_validated(&mut self, action: Validated) {
		match action {
			Validated::AddImageFileBlob { slot_id, blob } => {
				self.slots.push(SlotView::new(slot_id, blob));
			}

			Validated::AddFileName { index, name } => {
				self.slots[index].file_name = name;
			}

			Validated::SetImageFileBlob { index, blob } => {
				self.slots[index].blob = Some(blob);
				self.current_image_index = index;
			}

			Validated::ResetImageFileBlob { index, original } => {
				let slot = &mut self.slots[index];
				slot.blob = original;
				slot.quality = Quality::default();
				slot.orientation = Orientation::default();
			}

			Validated::RemoveImageFileBlob(index) => {
				self.slots.remove(index);
				if self.current_image_index >= self.slots.len() {
					self.current_image_index = self.slots.len().saturating_sub(1);
				}
			}

			Validated::SetCurrentImageIndex(index) => self.current_image_index = index,

			Validated::SetQuality { index, quality } => {
				self.slots[index].quality = quality;
				self.current_image_index = index;
			}

			Validated::SetOrientation { index, orientation } => {
				self.slots[index].orientation = orientation;
				self.current_image_index = index;
			}

			Validated::SetIsLoading(is_loading) => self.is_loading = is_loading,

			Validated::SetIsModalOpen(is_modal_open) => self.is_modal_open = is_modal_open,

			Validated::SetIsErrors { index, is_error } => self.slots[index].is_error = is_error,

			Validated::SetRetrieveImagesWorker(worker) => self.retrieve_images_worker = worker,

			Validated::SetModifyImagesWorker(worker) => self.modify_images_worker = worker,

			Validated::Hydrate(slots) => {
				self.slots = slots;
				if self.current_image_index >= self.slots.len() {
					self.current_image_index = 0;
				}
			}

			Validated::BeginModification(index) => {
				let slot = &mut self.slots[index];
				slot.latest_revision += 1;
				slot.is_modifying = true;
			}

			Validated::FinishModification { index, revision } => {
				let slot = &mut self.slots[index];
				if revision >= slot.latest_revision {
					slot.is_modifying = false;
				}
			}
		}
	}
}

/// Pure transition function, `apply` by value.
#[must_use]
pub fn reduce(mut state: ImageFieldState, action: Action) -> ImageFieldState {
	state.apply(action);
	state
}

/// Everything that can happen to an [`ImageFieldState`].
///
/// Indices and numeric values are kept raw so that payloads coming from outside can be
/// checked against the state they are applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum Action {
	AddImageFileBlob {
		slot_id: SlotId,
		blob: Option<ImageBlob>,
	},
	/// A negative index names the last slot.
	AddFileName { index: i64, name: String },
	SetImageFileBlob { index: i64, blob: ImageBlob },
	ResetImageFileBlob {
		index: i64,
		original: Option<ImageBlob>,
	},
	RemoveImageFileBlob { index: i64 },
	SetCurrentImageIndex { index: i64 },
	SetQuality { index: i64, quality: i64 },
	SetOrientation { index: i64, orientation: i64 },
	SetIsLoading { is_loading: bool },
	SetIsModalOpen { is_modal_open: bool },
	SetIsErrors { index: i64, is_error: bool },
	SetRetrieveImagesWorker { worker: Option<WorkerId> },
	SetModifyImagesWorker { worker: Option<WorkerId> },
	Hydrate { slots: Vec<SlotView> },
	BeginModification { index: i64 },
	FinishModification { index: i64, revision: u64 },
}

enum Validated {
	AddImageFileBlob {
		slot_id: SlotId,
		blob: Option<ImageBlob>,
	},
	AddFileName {
		index: usize,
		name: String,
	},
	SetImageFileBlob {
		index: usize,
		blob: ImageBlob,
	},
	ResetImageFileBlob {
		index: usize,
		original: Option<ImageBlob>,
	},
	RemoveImageFileBlob(usize),
	SetCurrentImageIndex(usize),
	SetQuality {
		index: usize,
		quality: Quality,
	},
	SetOrientation {
		index: usize,
		orientation: Orientation,
	},
	SetIsLoading(bool),
	SetIsModalOpen(bool),
	SetIsErrors {
		index: usize,
		is_error: bool,
	},
	SetRetrieveImagesWorker(Option<WorkerId>),
	SetModifyImagesWorker(Option<WorkerId>),
	Hydrate(Vec<SlotView>),
	BeginModification(usize),
	FinishModification {
		index: usize,
		revision: u64,
	},
}

impl Action {
	#[must_use]
	pub const fn tag(&self) -> &'static str {
		match self {
			Self::AddImageFileBlob { .. } => "addImageFileBlob",
			Self::AddFileName { .. } => "addFileName",
			Self::SetImageFileBlob { .. } => "setImageFileBlob",
			Self::ResetImageFileBlob { .. } => "resetImageFileBlob",
			Self::RemoveImageFileBlob { .. } => "removeImageFileBlob",
			Self::SetCurrentImageIndex { .. } => "setCurrentImageIndex",
			Self::SetQuality { .. } => "setQuality",
			Self::SetOrientation { .. } => "setOrientation",
			Self::SetIsLoading { .. } => "setIsLoading",
			Self::SetIsModalOpen { .. } => "setIsModalOpen",
			Self::SetIsErrors { .. } => "setIsErrors",
			Self::SetRetrieveImagesWorker { .. } => "setRetrieveImagesWorker",
			Self::SetModifyImagesWorker { .. } => "setModifyImagesWorker",
			Self::Hydrate { .. } => "hydrate",
			Self::BeginModification { .. } => "beginModification",
			Self::FinishModification { .. } => "finishModification",
		}
	}

	fn validate(self, state: &ImageFieldState) -> Result<Validated, ValidationError> {
		let len = state.slots.len();

		Ok(match self {
			Self::AddImageFileBlob { slot_id, blob } => {
				Validated::AddImageFileBlob { slot_id, blob }
			}

			Self::AddFileName { index, name } => Validated::AddFileName {
				index: if index < 0 {
					len.checked_sub(1)
						.ok_or(ValidationError::IndexOutOfBounds { index, len })?
				} else {
					slot_index(index, len)?
				},
				name,
			},

			Self::SetImageFileBlob { index, blob } => Validated::SetImageFileBlob {
				index: slot_index(index, len)?,
				blob,
			},

			Self::ResetImageFileBlob { index, original } => Validated::ResetImageFileBlob {
				index: slot_index(index, len)?,
				original,
			},

			Self::RemoveImageFileBlob { index } => {
				Validated::RemoveImageFileBlob(slot_index(index, len)?)
			}

			Self::SetCurrentImageIndex { index } => {
				// An empty field still points at index 0.
				if len == 0 && index == 0 {
					Validated::SetCurrentImageIndex(0)
				} else {
					Validated::SetCurrentImageIndex(slot_index(index, len)?)
				}
			}

			Self::SetQuality { index, quality } => Validated::SetQuality {
				index: slot_index(index, len)?,
				quality: Quality::new(quality)?,
			},

			Self::SetOrientation { index, orientation } => Validated::SetOrientation {
				index: slot_index(index, len)?,
				orientation: Orientation::new(orientation)?,
			},

			Self::SetIsLoading { is_loading } => Validated::SetIsLoading(is_loading),

			Self::SetIsModalOpen { is_modal_open } => Validated::SetIsModalOpen(is_modal_open),

			Self::SetIsErrors { index, is_error } => Validated::SetIsErrors {
				index: slot_index(index, len)?,
				is_error,
			},

			Self::SetRetrieveImagesWorker { worker } => Validated::SetRetrieveImagesWorker(worker),

			Self::SetModifyImagesWorker { worker } => Validated::SetModifyImagesWorker(worker),

			Self::Hydrate { slots } => Validated::Hydrate(slots),

			Self::BeginModification { index } => {
				Validated::BeginModification(slot_index(index, len)?)
			}

			Self::FinishModification { index, revision } => Validated::FinishModification {
				index: slot_index(index, len)?,
				revision,
			},
		})
	}
}

pub(crate) fn slot_index(index: i64, len: usize) -> Result<usize, ValidationError> {
	let Ok(unsigned) = usize::try_from(index) else {
		return Err(ValidationError::NegativeIndex(index));
	};

	if unsigned >= len {
		return Err(ValidationError::IndexOutOfBounds { index, len });
	}

	Ok(unsigned)
}

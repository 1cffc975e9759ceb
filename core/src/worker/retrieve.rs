use crate::{
	error::{Error, Result},
	slot::{ImageBlob, ImageSlot, Orientation, Projections, Quality, SlotFields, SlotId},
	store::FieldRepository,
};

use imf_actors::Worker;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveRequest {
	pub storage_key: String,
	pub max_images: usize,
}

pub type RetrieveResponse = Result<RetrievedImages>;

/// What the foreground needs of a persisted slot, the original stays on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedSlot {
	pub id: SlotId,
	pub modified: Option<ImageBlob>,
	pub file_name: String,
	pub quality: Quality,
	pub orientation: Orientation,
	pub revision: u64,
}

impl From<ImageSlot> for RetrievedSlot {
	fn from(
		ImageSlot {
			id,
			modified,
			file_name,
			quality,
			orientation,
			revision,
			..
		}: ImageSlot,
	) -> Self {
		Self {
			id,
			modified,
			file_name,
			quality,
			orientation,
			revision,
		}
	}
}

impl SlotFields for RetrievedSlot {
	fn file_name(&self) -> &str {
		&self.file_name
	}

	fn modified(&self) -> Option<&ImageBlob> {
		self.modified.as_ref()
	}

	fn quality(&self) -> Quality {
		self.quality
	}

	fn orientation(&self) -> Orientation {
		self.orientation
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedImages {
	pub slots: Vec<RetrievedSlot>,
	pub max_images: usize,
}

impl RetrievedImages {
	#[must_use]
	pub fn file_names(&self) -> Vec<String> {
		self.slots.file_names()
	}

	#[must_use]
	pub fn modified_files(&self) -> Vec<Option<ImageBlob>> {
		self.slots.modified_files()
	}

	#[must_use]
	pub fn qualities(&self) -> Vec<Quality> {
		self.slots.qualities(self.max_images)
	}

	#[must_use]
	pub fn orientations(&self) -> Vec<Orientation> {
		self.slots.orientations(self.max_images)
	}
}

#[instrument(skip(repository), err)]
pub async fn retrieve_images(
	repository: &FieldRepository,
	request: RetrieveRequest,
) -> Result<RetrievedImages> {
	let RetrieveRequest {
		storage_key,
		max_images,
	} = request;

	let slots = repository.load(&storage_key).await?;

	debug!(len = slots.len(), "Retrieved image field");

	Ok(RetrievedImages {
		slots: slots.into_iter().map(Into::into).collect(),
		max_images,
	})
}

/// Loads persisted fields off the foreground.
pub struct RetrievalWorker {
	repository: FieldRepository,
}

impl RetrievalWorker {
	#[must_use]
	pub const fn new(repository: FieldRepository) -> Self {
		Self { repository }
	}
}

impl Worker for RetrievalWorker {
	const NAME: &'static str = "retrieve_images";

	type Request = RetrieveRequest;
	type Response = RetrieveResponse;

	async fn handle(&mut self, request: Self::Request) -> Self::Response {
		retrieve_images(&self.repository, request).await
	}

	fn on_panic(&self, reason: String) -> Self::Response {
		Err(Error::Unknown(reason))
	}
}

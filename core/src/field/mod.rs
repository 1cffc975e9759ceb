//! The coordinator of one image field.
//!
//! [`ImageField`] is the only stateful piece: it owns the foreground [`ImageFieldState`], talks
//! to the [`FieldRepository`] and the two background workers, and notifies the parent form.
//! Every handler checks the field's [`Liveness`] after each await, so nothing lands in the state
//! or reaches the parent once the field was unmounted.

use crate::{
	codec::{ImageCodec, ImagesCodec},
	config::{ConfigError, ImageFieldConfig},
	error::Result,
	form::FormBundle,
	slot::SlotId,
	state::{Action, ImageFieldState},
	store::FieldRepository,
	worker::{
		ModificationWorker, ModifyRequest, ModifyResponse, RetrievalWorker, RetrieveRequest,
		RetrieveResponse,
	},
};

use std::sync::Arc;

use async_channel as chan;
use futures_concurrency::future::{Join, Race};
use imf_actors::{spawn, WorkerHandle};
use tokio::sync::watch;
use tracing::{debug, instrument, trace};

mod boundary;
mod handlers;
mod liveness;
mod parent;

pub use boundary::{ErrorBoundary, TracingErrorBoundary};
pub use liveness::Liveness;
pub use parent::{InvalidKind, ParentAction, ParentDispatcher};

/// A response coming back from one of the field's workers.
#[derive(Debug)]
pub enum WorkerMessage {
	Retrieve(RetrieveResponse),
	Modify(ModifyResponse),
}

struct Workers {
	retrieve: WorkerHandle<RetrieveRequest>,
	retrieve_rx: chan::Receiver<RetrieveResponse>,
	modify: WorkerHandle<ModifyRequest>,
	modify_rx: chan::Receiver<ModifyResponse>,
}

pub struct ImageField {
	config: ImageFieldConfig,
	repository: FieldRepository,
	codec: Arc<dyn ImageCodec>,
	boundary: Arc<dyn ErrorBoundary>,
	parent: ParentDispatcher,
	state_tx: watch::Sender<ImageFieldState>,
	liveness: Liveness,
	workers: Option<Workers>,
}

pub struct ImageFieldBuilder {
	config: ImageFieldConfig,
	repository: FieldRepository,
	codec: Arc<dyn ImageCodec>,
	boundary: Arc<dyn ErrorBoundary>,
	with_workers: bool,
}

impl ImageFieldBuilder {
	#[must_use]
	pub fn codec(mut self, codec: impl ImageCodec) -> Self {
		self.codec = Arc::new(codec);
		self
	}

	#[must_use]
	pub fn error_boundary(mut self, boundary: impl ErrorBoundary) -> Self {
		self.boundary = Arc::new(boundary);
		self
	}

	/// Run retrievals and modifications inline, on the caller's task.
	#[must_use]
	pub const fn without_workers(mut self) -> Self {
		self.with_workers = false;
		self
	}

	/// Spawns the workers (unless disabled), so this must be called within a Tokio runtime.
	pub fn build(self, parent: ParentDispatcher) -> std::result::Result<ImageField, ConfigError> {
		let Self {
			config,
			repository,
			codec,
			boundary,
			with_workers,
		} = self;

		config.validate()?;

		let (state_tx, _) = watch::channel(ImageFieldState::default());

		let workers = with_workers.then(|| {
			let (retrieve, retrieve_rx) = spawn(RetrievalWorker::new(repository.clone()));
			let (modify, modify_rx) = spawn(ModificationWorker::new(
				repository.clone(),
				Arc::clone(&codec),
			));

			Workers {
				retrieve,
				retrieve_rx,
				modify,
				modify_rx,
			}
		});

		let field = ImageField {
			config,
			repository,
			codec,
			boundary,
			parent,
			state_tx,
			liveness: Liveness::new(),
			workers,
		};

		if let Some(workers) = &field.workers {
			field.dispatch(Action::SetRetrieveImagesWorker {
				worker: Some(workers.retrieve.id()),
			});
			field.dispatch(Action::SetModifyImagesWorker {
				worker: Some(workers.modify.id()),
			});
		}

		Ok(field)
	}
}

impl ImageField {
	#[must_use]
	pub fn builder(config: ImageFieldConfig, repository: FieldRepository) -> ImageFieldBuilder {
		ImageFieldBuilder {
			config,
			repository,
			codec: Arc::new(ImagesCodec),
			boundary: Arc::new(TracingErrorBoundary),
			with_workers: true,
		}
	}

	#[must_use]
	pub const fn config(&self) -> &ImageFieldConfig {
		&self.config
	}

	#[must_use]
	pub const fn liveness(&self) -> &Liveness {
		&self.liveness
	}

	/// Snapshot of the foreground state.
	#[must_use]
	pub fn state(&self) -> ImageFieldState {
		self.state_tx.borrow().clone()
	}

	#[must_use]
	pub fn subscribe(&self) -> watch::Receiver<ImageFieldState> {
		self.state_tx.subscribe()
	}

	pub fn dispatch(&self, action: Action) {
		self.state_tx.send_modify(|state| state.apply(action));
	}

	/// Every currently valid image, as the parent form should submit them.
	#[must_use]
	pub fn valid_bundle(&self) -> FormBundle {
		let state = self.state_tx.borrow();
		let mut bundle = FormBundle::new(self.config.name.as_str());

		for slot in state.slots.iter().filter(|slot| !slot.is_error) {
			if let Some(blob) = &slot.blob {
				// Re-encoded blobs carry the name matching their format.
				let file_name = blob.file_name.as_deref().unwrap_or(&slot.file_name);
				bundle.push(file_name, blob.clone());
			}
		}

		bundle
	}

	/// Waits for the next worker response, `None` once unmounted or when running without
	/// workers.
	pub async fn next_worker_message(&self) -> Option<WorkerMessage> {
		let workers = self.workers.as_ref()?;

		if !self.liveness.is_mounted() {
			return None;
		}

		(
			async {
				workers
					.retrieve_rx
					.recv()
					.await
					.ok()
					.map(WorkerMessage::Retrieve)
			},
			async {
				workers
					.modify_rx
					.recv()
					.await
					.ok()
					.map(WorkerMessage::Modify)
			},
			async {
				self.liveness.unmounted().await;
				None
			},
		)
			.race()
			.await
	}

	pub async fn handle_worker_message(&self, message: WorkerMessage) -> Result<()> {
		match message {
			WorkerMessage::Retrieve(response) => {
				self.handle_retrieve_images_message(response).await
			}
			WorkerMessage::Modify(response) => self.handle_modify_images_message(response).await,
		}
	}

	/// Pumps worker responses into the handlers until the field is unmounted.
	#[instrument(skip(self), fields(field = %self.config.name))]
	pub async fn run(&self) {
		while let Some(message) = self.next_worker_message().await {
			if let Err(e) = self.handle_worker_message(message).await {
				trace!(%e, "Worker message handling failed, already reported");
			}
		}

		debug!("Stopped pumping worker messages");
	}

	/// Marks the field as gone and stops its workers once their current request is done.
	#[instrument(skip(self), fields(field = %self.config.name))]
	pub async fn unmount(&self) {
		self.liveness.unmount();

		if let Some(workers) = &self.workers {
			(workers.retrieve.terminate(), workers.modify.terminate())
				.join()
				.await;
		}

		debug!("Image field unmounted");
	}

	fn report<T>(&self, res: Result<T>) -> Result<T> {
		if let Err(e) = &res {
			if e.is_unmounted() {
				debug!(field = %self.config.name, "Image field unmounted, discarding result");
			} else {
				self.boundary.report(&self.config.name, e);
			}
		}

		res
	}

	/// Position and latest handed out revision of a slot in the foreground state.
	fn locate(&self, slot_id: SlotId) -> Option<(usize, u64)> {
		self.state_tx
			.borrow()
			.slot(slot_id)
			.map(|(index, slot)| (index, slot.latest_revision))
	}

	fn finish_modification(&self, slot_id: SlotId, revision: u64) {
		if let Some((index, _)) = self.locate(slot_id) {
			self.dispatch(Action::FinishModification {
				index: raw_index(index),
				revision,
			});
		}
	}
}

/// Actions carry raw indices, out of range ones are rejected by the reducer.
fn raw_index(index: usize) -> i64 {
	i64::try_from(index).unwrap_or(i64::MAX)
}

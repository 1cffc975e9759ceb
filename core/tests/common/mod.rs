#![allow(dead_code, clippy::unwrap_used)]

use imf_core::{
	codec::{CodecOptions, ImageCodec},
	config::ImageFieldConfig,
	field::{ErrorBoundary, ParentAction, ParentDispatcher},
	slot::ImageBlob,
	store::{FieldRepository, KeyValueStore, MemoryStore, PersistentStore, StoreError},
	Error, ErrorKind, ImageField, Result,
};

use std::{
	iter,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex,
	},
};

use async_channel as chan;
use async_trait::async_trait;

pub const STORAGE_KEY: &str = "form/photos";
pub const MAX_IMAGE_SIZE: u64 = 100_000;

pub fn png(name: &str, size: usize) -> ImageBlob {
	ImageBlob::new_file(name, "image/png", vec![42; size])
}

pub fn bmp(name: &str, size: usize) -> ImageBlob {
	ImageBlob::new_file(name, "image/bmp", vec![42; size])
}

pub fn config() -> ImageFieldConfig {
	ImageFieldConfig::new("photos", STORAGE_KEY).with_max_image_size(MAX_IMAGE_SIZE)
}

/// Keeps the first `quality` tenths of the bytes, so results are easy to tell apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncatingCodec;

#[async_trait]
impl ImageCodec for TruncatingCodec {
	async fn transform(&self, original: ImageBlob, options: CodecOptions) -> Result<ImageBlob> {
		let keep = original.bytes.len() * usize::from(options.quality.get()) / 10;

		Ok(ImageBlob {
			bytes: original.bytes[..keep].to_vec(),
			..original
		})
	}
}

/// [`TruncatingCodec`] that only finishes a transform once the test lets it through.
pub struct GatedCodec {
	entered: chan::Sender<()>,
	gate: chan::Receiver<()>,
}

/// Test side of a [`GatedCodec`].
pub struct Gate {
	entered: chan::Receiver<()>,
	open: chan::Sender<()>,
}

impl GatedCodec {
	pub fn new() -> (Self, Gate) {
		let (entered_tx, entered_rx) = chan::unbounded();
		let (open_tx, open_rx) = chan::unbounded();

		(
			Self {
				entered: entered_tx,
				gate: open_rx,
			},
			Gate {
				entered: entered_rx,
				open: open_tx,
			},
		)
	}
}

impl Gate {
	/// Waits until a transform is blocked on this gate.
	pub async fn entered(&self) {
		self.entered.recv().await.unwrap();
	}

	/// Lets one transform through.
	pub async fn open(&self) {
		self.open.send(()).await.unwrap();
	}
}

#[async_trait]
impl ImageCodec for GatedCodec {
	async fn transform(&self, original: ImageBlob, options: CodecOptions) -> Result<ImageBlob> {
		self.entered
			.send(())
			.await
			.map_err(|_| Error::Unknown("gate dropped".to_string()))?;

		self.gate
			.recv()
			.await
			.map_err(|_| Error::Unknown("gate closed".to_string()))?;

		TruncatingCodec.transform(original, options).await
	}
}

/// Memory backend whose writes can be made to fail.
pub struct FlakyStore {
	inner: MemoryStore,
	fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
	pub fn new() -> (Self, Arc<AtomicBool>) {
		let fail_writes = Arc::new(AtomicBool::new(false));

		(
			Self {
				inner: MemoryStore::default(),
				fail_writes: Arc::clone(&fail_writes),
			},
			fail_writes,
		)
	}
}

#[async_trait]
impl KeyValueStore for FlakyStore {
	async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError> {
		self.inner.get(key).await
	}

	async fn set(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), StoreError> {
		if self.fail_writes.load(Ordering::Acquire) {
			return Err(StoreError::Backend("disk is full".to_string()));
		}

		self.inner.set(key, value).await
	}

	async fn delete(&self, key: &str) -> std::result::Result<(), StoreError> {
		self.inner.delete(key).await
	}
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBoundary(Arc<Mutex<Vec<ErrorKind>>>);

impl RecordingBoundary {
	pub fn kinds(&self) -> Vec<ErrorKind> {
		self.0.lock().unwrap().clone()
	}
}

impl ErrorBoundary for RecordingBoundary {
	fn report(&self, _: &str, error: &Error) {
		self.0.lock().unwrap().push(error.kind());
	}
}

pub struct Harness {
	pub field: Arc<ImageField>,
	pub repository: FieldRepository,
	pub parent_rx: chan::Receiver<ParentAction>,
	pub boundary: RecordingBoundary,
}

impl Harness {
	/// Runs everything inline on the test task.
	pub fn inline(repository: FieldRepository) -> Self {
		Self::build(repository, TruncatingCodec, false)
	}

	pub fn inline_with_codec(repository: FieldRepository, codec: impl ImageCodec) -> Self {
		Self::build(repository, codec, false)
	}

	pub fn with_workers(repository: FieldRepository, codec: impl ImageCodec) -> Self {
		Self::build(repository, codec, true)
	}

	fn build(repository: FieldRepository, codec: impl ImageCodec, with_workers: bool) -> Self {
		let (parent, parent_rx) = ParentDispatcher::channel();
		let boundary = RecordingBoundary::default();

		let mut builder = ImageField::builder(config(), repository.clone())
			.codec(codec)
			.error_boundary(boundary.clone());

		if !with_workers {
			builder = builder.without_workers();
		}

		Self {
			field: Arc::new(builder.build(parent).unwrap()),
			repository,
			parent_rx,
			boundary,
		}
	}

	/// Everything the parent form was told so far.
	pub fn parent_actions(&self) -> Vec<ParentAction> {
		iter::from_fn(|| self.parent_rx.try_recv().ok()).collect()
	}

	/// Receives the next worker response and hands it to the field.
	pub async fn pump_one(&self) -> Result<()> {
		let message = self.field.next_worker_message().await.unwrap();
		self.field.handle_worker_message(message).await
	}
}

pub fn memory_repository() -> FieldRepository {
	FieldRepository::new(PersistentStore::in_memory())
}

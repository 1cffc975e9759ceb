use crate::{slot::SlotId, store::StoreError};

use imf_actors::WorkerError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to read from the cache <key='{key}'>: {source}")]
	CacheRead {
		key: String,
		#[source]
		source: StoreError,
	},
	#[error("failed to write to the cache <key='{key}'>: {source}")]
	CacheWrite {
		key: String,
		#[source]
		source: StoreError,
	},

	#[error(transparent)]
	Validation(#[from] ValidationError),
	#[error(transparent)]
	Invariant(#[from] InvariantViolation),

	#[error("image codec failed: {0}")]
	Codec(#[from] imf_images::Error),

	#[error("unknown error: {0}")]
	Unknown(String),
}

/// Coarse classification of failures, the way error boundaries bucket them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	CacheRead,
	CacheWrite,
	Parse,
	Invariant,
	Unknown,
}

impl Error {
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::CacheRead { .. } => ErrorKind::CacheRead,
			Self::CacheWrite { .. } => ErrorKind::CacheWrite,
			Self::Validation(_) => ErrorKind::Parse,
			Self::Invariant(_) => ErrorKind::Invariant,
			Self::Codec(_) | Self::Unknown(_) => ErrorKind::Unknown,
		}
	}

	#[must_use]
	pub const fn is_unmounted(&self) -> bool {
		matches!(self, Self::Invariant(InvariantViolation::Unmounted))
	}
}

impl From<WorkerError> for Error {
	fn from(e: WorkerError) -> Self {
		Self::Invariant(InvariantViolation::WorkerGone(e))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("quality must be between 1 and 10 <quality={0}>")]
	Quality(i64),
	#[error("orientation must be between 1 and 8 <orientation={0}>")]
	Orientation(i64),
	#[error("negative image index <index={0}>")]
	NegativeIndex(i64),
	#[error("image index out of bounds <index={index}, len={len}>")]
	IndexOutOfBounds { index: i64, len: usize },
	#[error("too many images <max={max}, attempted={attempted}>")]
	TooManyImages { max: usize, attempted: usize },
	#[error("no files were provided")]
	NoFiles,
	#[error("invalid allowed types pattern <pattern='{pattern}'>: {reason}")]
	MimePattern { pattern: String, reason: String },
	#[error("worker result is inconsistent: {0}")]
	MalformedResult(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum InvariantViolation {
	#[error("image field was unmounted, discarding result")]
	Unmounted,
	#[error("image slot not found <slot_id='{0}'>")]
	SlotNotFound(SlotId),
	#[error("image slot has no original file <slot_id='{0}'>")]
	MissingOriginal(SlotId),
	#[error(
		"a newer modification already landed <slot_id='{slot_id}', revision={revision}, stored_revision={stored_revision}>"
	)]
	StaleRevision {
		slot_id: SlotId,
		revision: u64,
		stored_revision: u64,
	},
	#[error(transparent)]
	WorkerGone(WorkerError),
}

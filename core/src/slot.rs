//! The data model of an image field: one [`ImageSlot`] record per image.
//!
//! Consumers that still think in terms of parallel arrays (file names, modified files,
//! qualities, orientations) get them through [`Projections`], which derives each array from
//! the ordered slots so the arrays can never fall out of alignment.

use crate::error::ValidationError;

use std::fmt;

use imf_utils::mime_subtype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SlotId = Uuid;

/// Compression level handed to the codec, `10` meaning untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
	pub const MIN: u8 = 1;
	pub const MAX: u8 = 10;

	pub fn new(value: i64) -> Result<Self, ValidationError> {
		u8::try_from(value)
			.ok()
			.filter(|value| (Self::MIN..=Self::MAX).contains(value))
			.map(Self)
			.ok_or(ValidationError::Quality(value))
	}

	#[must_use]
	pub const fn get(self) -> u8 {
		self.0
	}

	/// The codec wants a fraction, `quality / 10`.
	#[must_use]
	pub fn as_fraction(self) -> f32 {
		f32::from(self.0) / f32::from(Self::MAX)
	}
}

impl Default for Quality {
	fn default() -> Self {
		Self(Self::MAX)
	}
}

impl TryFrom<u8> for Quality {
	type Error = ValidationError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Self::new(i64::from(value))
	}
}

impl From<Quality> for u8 {
	fn from(Quality(value): Quality) -> Self {
		value
	}
}

impl fmt::Display for Quality {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// EXIF orientation code, `1` meaning as-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Orientation(u8);

impl Default for Orientation {
	fn default() -> Self {
		Self(Self::MIN)
	}
}

impl Orientation {
	pub const MIN: u8 = 1;
	pub const MAX: u8 = 8;

	pub fn new(value: i64) -> Result<Self, ValidationError> {
		u8::try_from(value)
			.ok()
			.filter(|value| (Self::MIN..=Self::MAX).contains(value))
			.map(Self)
			.ok_or(ValidationError::Orientation(value))
	}

	#[must_use]
	pub const fn get(self) -> u8 {
		self.0
	}
}

impl TryFrom<u8> for Orientation {
	type Error = ValidationError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Self::new(i64::from(value))
	}
}

impl From<Orientation> for u8 {
	fn from(orientation: Orientation) -> Self {
		orientation.get()
	}
}

impl From<Orientation> for imf_images::Orientation {
	fn from(orientation: Orientation) -> Self {
		u32::from(orientation.get()).into()
	}
}

impl fmt::Display for Orientation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.get())
	}
}

/// Raw image bytes plus their mime type. Blobs carrying a `file_name` are "files", straight
/// from the user's file picker; derived blobs may not have one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlob {
	pub bytes: Vec<u8>,
	pub mime_type: String,
	#[serde(default)]
	pub file_name: Option<String>,
}

impl ImageBlob {
	pub fn new_file(
		file_name: impl Into<String>,
		mime_type: impl Into<String>,
		bytes: Vec<u8>,
	) -> Self {
		Self {
			bytes,
			mime_type: mime_type.into(),
			file_name: Some(file_name.into()),
		}
	}

	pub fn new_blob(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self {
			bytes,
			mime_type: mime_type.into(),
			file_name: None,
		}
	}

	#[must_use]
	pub fn size(&self) -> u64 {
		u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
	}

	#[must_use]
	pub fn mime_subtype(&self) -> String {
		mime_subtype(&self.mime_type)
	}

	#[must_use]
	pub const fn is_file(&self) -> bool {
		self.file_name.is_some()
	}
}

impl fmt::Debug for ImageBlob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ImageBlob")
			.field("size", &self.bytes.len())
			.field("mime_type", &self.mime_type)
			.field("file_name", &self.file_name)
			.finish()
	}
}

/// One image of a field, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSlot {
	pub id: SlotId,
	/// The user's unmodified upload, used to redo transforms and to reset.
	pub original: Option<ImageBlob>,
	/// What gets shown and submitted.
	pub modified: Option<ImageBlob>,
	pub file_name: String,
	pub quality: Quality,
	pub orientation: Orientation,
	/// Revision of the last modification (or reset) written for this slot.
	#[serde(default)]
	pub revision: u64,
}

impl ImageSlot {
	#[must_use]
	pub fn from_file(file: ImageBlob) -> Self {
		Self {
			id: SlotId::new_v4(),
			file_name: file.file_name.clone().unwrap_or_default(),
			modified: Some(file.clone()),
			original: Some(file),
			quality: Quality::default(),
			orientation: Orientation::default(),
			revision: 0,
		}
	}
}

/// Read access to the per-slot values the parallel-array projections are built from.
pub trait SlotFields {
	fn file_name(&self) -> &str;
	fn modified(&self) -> Option<&ImageBlob>;
	fn quality(&self) -> Quality;
	fn orientation(&self) -> Orientation;
}

impl SlotFields for ImageSlot {
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

pub trait Projections {
	fn file_names(&self) -> Vec<String>;

	fn modified_files(&self) -> Vec<Option<ImageBlob>>;

	/// Padded with the default quality up to `max_images` entries.
	fn qualities(&self, max_images: usize) -> Vec<Quality>;

	/// Padded with the default orientation up to `max_images` entries.
	fn orientations(&self, max_images: usize) -> Vec<Orientation>;
}

impl<T: SlotFields> Projections for [T] {
	fn file_names(&self) -> Vec<String> {
		self.iter().map(|slot| slot.file_name().to_string()).collect()
	}

	fn modified_files(&self) -> Vec<Option<ImageBlob>> {
		self.iter().map(|slot| slot.modified().cloned()).collect()
	}

	fn qualities(&self, max_images: usize) -> Vec<Quality> {
		padded(self.iter().map(SlotFields::quality), max_images)
	}

	fn orientations(&self, max_images: usize) -> Vec<Orientation> {
		padded(self.iter().map(SlotFields::orientation), max_images)
	}
}

#[must_use]
pub fn original_files(slots: &[ImageSlot]) -> Vec<Option<ImageBlob>> {
	slots.iter().map(|slot| slot.original.clone()).collect()
}

fn padded<T: Default>(values: impl ExactSizeIterator<Item = T>, len: usize) -> Vec<T> {
	let missing = len.saturating_sub(values.len());
	values
		.chain(std::iter::repeat_with(T::default).take(missing))
		.collect()
}

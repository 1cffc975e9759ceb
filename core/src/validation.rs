use crate::{error::ValidationError, slot::ImageBlob};

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_ALLOWED_TYPES: &str = "^(jpeg|jpg|png|webp|gif)$";

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
	#[allow(clippy::unwrap_used)]
	Regex::new(DEFAULT_ALLOWED_TYPES).unwrap()
});

/// Pattern a mime subtype must match for an image to be accepted.
#[derive(Clone)]
pub struct MimePattern(Regex);

impl MimePattern {
	pub fn new(pattern: &str) -> Result<Self, ValidationError> {
		Regex::new(pattern)
			.map(Self)
			.map_err(|e| ValidationError::MimePattern {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			})
	}

	#[must_use]
	pub fn matches(&self, subtype: &str) -> bool {
		self.0.is_match(subtype)
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}
}

impl Default for MimePattern {
	fn default() -> Self {
		Self(DEFAULT_PATTERN.clone())
	}
}

impl fmt::Debug for MimePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("MimePattern").field(&self.as_str()).finish()
	}
}

impl PartialEq for MimePattern {
	fn eq(&self, other: &Self) -> bool {
		self.as_str() == other.as_str()
	}
}

impl Serialize for MimePattern {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for MimePattern {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let pattern = String::deserialize(deserializer)?;
		Self::new(&pattern).map_err(de::Error::custom)
	}
}

/// An image is invalid when it is missing, too big, has no mime subtype or a subtype the
/// pattern rejects.
#[must_use]
pub fn is_image_invalid(blob: Option<&ImageBlob>, max_size: u64, allowed: &MimePattern) -> bool {
	let Some(blob) = blob else {
		return true;
	};

	if blob.size() > max_size {
		return true;
	}

	let subtype = blob.mime_subtype();

	subtype.is_empty() || !allowed.matches(&subtype)
}

/// Validity of every image at once, index-aligned with the input.
pub fn validate_images<'blob>(
	blobs: impl IntoIterator<Item = Option<&'blob ImageBlob>>,
	max_size: u64,
	allowed: &MimePattern,
) -> Vec<bool> {
	blobs
		.into_iter()
		.map(|blob| is_image_invalid(blob, max_size, allowed))
		.collect()
}

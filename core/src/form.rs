use crate::slot::ImageBlob;

use serde::{Deserialize, Serialize};

/// A named file, the unit a form submission is made of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntry {
	pub file_name: String,
	pub blob: ImageBlob,
}

/// Every currently valid image of a field, keyed by the field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormBundle {
	pub field_name: String,
	pub entries: Vec<FormEntry>,
}

impl FormBundle {
	pub fn new(field_name: impl Into<String>) -> Self {
		Self {
			field_name: field_name.into(),
			entries: vec![],
		}
	}

	pub fn push(&mut self, file_name: impl Into<String>, blob: ImageBlob) {
		self.entries.push(FormEntry {
			file_name: file_name.into(),
			blob,
		});
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn file_names(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|entry| entry.file_name.as_str())
	}
}

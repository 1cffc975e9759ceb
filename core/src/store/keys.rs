/// Keys an image field lives under, all derived from its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeys {
	storage_key: String,
}

impl FieldKeys {
	pub fn new(storage_key: impl Into<String>) -> Self {
		Self {
			storage_key: storage_key.into(),
		}
	}

	#[must_use]
	pub fn storage_key(&self) -> &str {
		&self.storage_key
	}

	/// The single record collection, the only key we write to.
	#[must_use]
	pub fn slots(&self) -> String {
		self.key("slots")
	}

	#[must_use]
	pub fn original_files(&self) -> String {
		self.key("originalFiles")
	}

	#[must_use]
	pub fn modified_files(&self) -> String {
		self.key("modifiedFiles")
	}

	#[must_use]
	pub fn file_names(&self) -> String {
		self.key("fileNames")
	}

	#[must_use]
	pub fn qualities(&self) -> String {
		self.key("qualities")
	}

	#[must_use]
	pub fn orientations(&self) -> String {
		self.key("orientations")
	}

	fn key(&self, suffix: &str) -> String {
		format!("{}/{suffix}", self.storage_key)
	}
}

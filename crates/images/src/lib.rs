#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::as_conversions,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod consts;
mod error;
mod formatter;
mod generic;
mod jpeg;
mod orientation;
mod png;

pub use error::{Error, Result};
pub use formatter::{is_supported, transform_image, EncodedImage, TransformOptions};
pub use orientation::Orientation;

use image::DynamicImage;

pub trait ImageHandler {
	fn maximum_size(&self) -> u64;

	fn check_size(&self, data: &[u8]) -> Result<()> {
		if u64::try_from(data.len())? > self.maximum_size() {
			Err(Error::TooLarge)
		} else {
			Ok(())
		}
	}

	fn decode(&self, data: &[u8]) -> Result<DynamicImage>;

	/// `quality` is already validated to be in `(0, 1]`.
	fn encode(&self, img: &DynamicImage, quality: f32) -> Result<EncodedImage>;
}

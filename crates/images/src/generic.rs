use crate::{consts::GENERIC_MAXIMUM_FILE_SIZE, EncodedImage, ImageHandler, Result};

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageOutputFormat};

/// Formats without a quality knob, so they're re-encoded as they are.
pub struct GenericHandler {
	format: ImageFormat,
}

impl GenericHandler {
	pub const fn new(format: ImageFormat) -> Self {
		Self { format }
	}
}

impl ImageHandler for GenericHandler {
	fn maximum_size(&self) -> u64 {
		GENERIC_MAXIMUM_FILE_SIZE
	}

	fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
		Ok(image::load_from_memory_with_format(data, self.format)?)
	}

	fn encode(&self, img: &DynamicImage, _quality: f32) -> Result<EncodedImage> {
		let mut bytes = Vec::new();

		let (output_format, mime_type) = match self.format {
			ImageFormat::Gif => (ImageOutputFormat::Gif, "image/gif"),
			_ => (ImageOutputFormat::Bmp, "image/bmp"),
		};

		img.write_to(&mut Cursor::new(&mut bytes), output_format)?;

		Ok(EncodedImage {
			bytes,
			mime_type: mime_type.to_string(),
		})
	}
}

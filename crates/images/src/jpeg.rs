use crate::{consts::GENERIC_MAXIMUM_FILE_SIZE, EncodedImage, ImageHandler, Result};

use image::{codecs::jpeg::JpegEncoder, ColorType, DynamicImage, ImageFormat};

pub struct JpegHandler {}

impl ImageHandler for JpegHandler {
	fn maximum_size(&self) -> u64 {
		GENERIC_MAXIMUM_FILE_SIZE
	}

	fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
		Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?)
	}

	#[allow(
		clippy::cast_possible_truncation,
		clippy::cast_sign_loss,
		clippy::as_conversions
	)]
	fn encode(&self, img: &DynamicImage, quality: f32) -> Result<EncodedImage> {
		// JPEG has no alpha channel
		let rgb = img.to_rgb8();
		let mut bytes = Vec::new();

		JpegEncoder::new_with_quality(&mut bytes, (quality * 100.0).round().clamp(1.0, 100.0) as u8)
			.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;

		Ok(EncodedImage {
			bytes,
			mime_type: "image/jpeg".to_string(),
		})
	}
}

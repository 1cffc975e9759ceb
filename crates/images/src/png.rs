use crate::{consts::GENERIC_MAXIMUM_FILE_SIZE, EncodedImage, ImageHandler, Result};

use image::{
	codecs::png::{CompressionType, FilterType, PngEncoder},
	ColorType, DynamicImage, ImageEncoder, ImageFormat,
};

pub struct PngHandler {}

impl ImageHandler for PngHandler {
	fn maximum_size(&self) -> u64 {
		GENERIC_MAXIMUM_FILE_SIZE
	}

	fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
		Ok(image::load_from_memory_with_format(data, ImageFormat::Png)?)
	}

	/// PNG is lossless, so quality only trades encoding speed for size: the lower the quality
	/// the harder we squeeze.
	fn encode(&self, img: &DynamicImage, quality: f32) -> Result<EncodedImage> {
		let compression = if quality >= 0.8 {
			CompressionType::Fast
		} else if quality >= 0.4 {
			CompressionType::Default
		} else {
			CompressionType::Best
		};

		let rgba = img.to_rgba8();
		let mut bytes = Vec::new();

		PngEncoder::new_with_quality(&mut bytes, compression, FilterType::Adaptive).write_image(
			rgba.as_raw(),
			rgba.width(),
			rgba.height(),
			ColorType::Rgba8,
		)?;

		Ok(EncodedImage {
			bytes,
			mime_type: "image/png".to_string(),
		})
	}
}

use crate::{
	consts,
	error::{Error, Result},
	generic::GenericHandler,
	jpeg::JpegHandler,
	png::PngHandler,
	ImageHandler, Orientation,
};

use image::ImageFormat;
use imf_utils::mime_subtype;
use tracing::{instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformOptions {
	/// Compression level, `1.0` means the best quality we can give.
	pub quality: f32,
	pub orientation: Orientation,
}

impl Default for TransformOptions {
	fn default() -> Self {
		Self {
			quality: 1.0,
			orientation: Orientation::Normal,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
	pub bytes: Vec<u8>,
	pub mime_type: String,
}

/// Decodes `data` according to `mime_type`, applies the requested orientation and encodes it
/// back at the requested quality.
///
/// The output keeps the input format whenever we have an encoder for it.
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn transform_image(
	data: &[u8],
	mime_type: &str,
	options: TransformOptions,
) -> Result<EncodedImage> {
	let TransformOptions {
		quality,
		orientation,
	} = options;

	if !(quality > 0.0 && quality <= 1.0) {
		return Err(Error::InvalidQuality(quality));
	}

	let subtype = mime_subtype(mime_type);
	let decoder = match_to_decoder(&subtype).ok_or_else(|| Error::Unsupported(mime_type.into()))?;
	decoder.check_size(data)?;

	let img = orientation.apply(decoder.decode(data)?);
	trace!(width = img.width(), height = img.height(), "Decoded and oriented image");

	match_to_encoder(&subtype)
		.ok_or_else(|| Error::Unsupported(mime_type.into()))?
		.encode(&img, quality)
}

/// Whether we know how to transform images of this mime type.
#[must_use]
pub fn is_supported(mime_type: &str) -> bool {
	match_to_decoder(&mime_subtype(mime_type)).is_some()
}

fn match_to_decoder(subtype: &str) -> Option<Box<dyn ImageHandler>> {
	if consts::JPEG_SUBTYPES.contains(&subtype) {
		return Some(Box::new(JpegHandler {}));
	}

	if consts::PNG_SUBTYPES.contains(&subtype) {
		return Some(Box::new(PngHandler {}));
	}

	match subtype {
		"gif" => Some(Box::new(GenericHandler::new(ImageFormat::Gif))),
		"bmp" | "x-ms-bmp" => Some(Box::new(GenericHandler::new(ImageFormat::Bmp))),
		"webp" => Some(Box::new(GenericHandler::new(ImageFormat::WebP))),
		_ => None,
	}
}

fn match_to_encoder(subtype: &str) -> Option<Box<dyn ImageHandler>> {
	if consts::DECODE_ONLY_SUBTYPES.contains(&subtype) {
		return Some(Box::new(PngHandler {}));
	}

	if consts::GENERIC_SUBTYPES.contains(&subtype)
		|| consts::JPEG_SUBTYPES.contains(&subtype)
		|| consts::PNG_SUBTYPES.contains(&subtype)
	{
		return match_to_decoder(subtype);
	}

	None
}

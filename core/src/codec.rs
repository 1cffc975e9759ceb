use crate::{
	error::{Error, Result},
	slot::{ImageBlob, Orientation, Quality},
};

use async_trait::async_trait;
use imf_images::{is_supported, transform_image, TransformOptions};
use imf_utils::mime_subtype;
use tokio::task::spawn_blocking;
use tracing::{instrument, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
	pub quality: Quality,
	pub orientation: Orientation,
}

/// The external image transform: re-encodes an original at some quality and orientation.
#[async_trait]
pub trait ImageCodec: Send + Sync + 'static {
	/// Takes the original by value, callers hand over their own copy.
	async fn transform(&self, original: ImageBlob, options: CodecOptions) -> Result<ImageBlob>;
}

/// [`ImageCodec`] backed by `imf-images`, decoding and encoding on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagesCodec;

#[async_trait]
impl ImageCodec for ImagesCodec {
	#[instrument(skip(self), err)]
	async fn transform(&self, original: ImageBlob, options: CodecOptions) -> Result<ImageBlob> {
		let ImageBlob {
			bytes,
			mime_type,
			file_name,
		} = original;

		if !is_supported(&mime_type) {
			return Err(imf_images::Error::Unsupported(mime_type).into());
		}

		let transform_options = TransformOptions {
			quality: options.quality.as_fraction(),
			orientation: options.orientation.into(),
		};

		let source_mime_type = mime_type.clone();

		let encoded = spawn_blocking(move || transform_image(&bytes, &mime_type, transform_options))
			.await
			.map_err(|e| {
				if e.is_panic() {
					Error::Unknown(format!("image codec panicked: {e}"))
				} else {
					Error::Unknown(format!("image codec task was cancelled: {e}"))
				}
			})??;

		trace!(
			size = encoded.bytes.len(),
			mime_type = %encoded.mime_type,
			"Image transformed"
		);

		let file_name = if encoded.mime_type == source_mime_type {
			file_name
		} else {
			file_name.map(|name| with_extension_for(&name, &encoded.mime_type))
		};

		Ok(ImageBlob {
			bytes: encoded.bytes,
			mime_type: encoded.mime_type,
			file_name,
		})
	}
}

/// `photo.webp` re-encoded as `image/png` is submitted as `photo.png`.
fn with_extension_for(file_name: &str, mime_type: &str) -> String {
	let extension = mime_subtype(mime_type);

	match file_name.rsplit_once('.') {
		Some((stem, _)) if !stem.is_empty() => format!("{stem}.{extension}"),
		_ => format!("{file_name}.{extension}"),
	}
}

use std::num::TryFromIntError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("error while loading the image (via the `image` crate): {0}")]
	Image(#[from] image::ImageError),
	#[error("there was an i/o error: {0}")]
	Io(#[from] std::io::Error),
	#[error("the image provided is unsupported <mime_type='{0}'>")]
	Unsupported(String),
	#[error("the image provided is too large (over 24MiB)")]
	TooLarge,
	#[error("invalid quality provided, expected a value in (0, 1] <quality={0}>")]
	InvalidQuality(f32),
	#[error("error while parsing integers")]
	TryFromInt(#[from] TryFromIntError),
}

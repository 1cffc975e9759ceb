pub const JPEG_SUBTYPES: [&str; 3] = ["jpeg", "jpg", "pjpeg"];

pub const PNG_SUBTYPES: [&str; 2] = ["png", "apng"];

/// Formats we can decode and re-encode in place, keyed by mime subtype.
pub const GENERIC_SUBTYPES: [&str; 3] = ["gif", "bmp", "x-ms-bmp"];

/// We can decode these, but we don't ship an encoder for them so they come back as PNG.
pub const DECODE_ONLY_SUBTYPES: [&str; 1] = ["webp"];

/// The maximum file size that an image can be in order to be transformed.
///
/// This value is in MiB.
pub(crate) const GENERIC_MAXIMUM_FILE_SIZE: u64 = MIB * 24;

/// The size of 1MiB in bytes
const MIB: u64 = 1_048_576;

pub mod error;

/// Splits a mime type like `image/png` into its subtype (`png`), lowercased.
///
/// Parameters (`image/svg+xml; charset=utf-8`) are dropped. Returns an empty string when
/// there is no subtype at all.
#[must_use]
pub fn mime_subtype(mime_type: &str) -> String {
	mime_type
		.split_once('/')
		.map(|(_, subtype)| subtype)
		.unwrap_or_default()
		.split(';')
		.next()
		.unwrap_or_default()
		.trim()
		.to_ascii_lowercase()
}

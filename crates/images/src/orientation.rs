use image::DynamicImage;

/// EXIF orientation, the way cameras (and users) tell us an image should be displayed.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
	#[default]
	Normal,
	CW90,
	CW180,
	CW270,
	MirroredVertical,
	MirroredHorizontal,
	MirroredHorizontalAnd90CW,
	MirroredHorizontalAnd270CW,
}

impl Orientation {
	/// Rotates and/or flips `img` so it shows up the way this orientation describes.
	#[must_use]
	pub fn apply(self, img: DynamicImage) -> DynamicImage {
		match self {
			Self::Normal => img,
			Self::CW180 => img.rotate180(),
			Self::CW270 => img.rotate270(),
			Self::CW90 => img.rotate90(),
			Self::MirroredHorizontal => img.fliph(),
			Self::MirroredVertical => img.flipv(),
			Self::MirroredHorizontalAnd90CW => img.fliph().rotate90(),
			Self::MirroredHorizontalAnd270CW => img.fliph().rotate270(),
		}
	}
}

impl From<u32> for Orientation {
	fn from(value: u32) -> Self {
		match value {
			2 => Self::MirroredHorizontal,
			3 => Self::CW180,
			4 => Self::MirroredVertical,
			5 => Self::MirroredHorizontalAnd270CW,
			6 => Self::CW90,
			7 => Self::MirroredHorizontalAnd90CW,
			8 => Self::CW270,
			_ => Self::Normal,
		}
	}
}

impl From<Orientation> for u32 {
	fn from(value: Orientation) -> Self {
		match value {
			Orientation::Normal => 1,
			Orientation::MirroredHorizontal => 2,
			Orientation::CW180 => 3,
			Orientation::MirroredVertical => 4,
			Orientation::MirroredHorizontalAnd270CW => 5,
			Orientation::CW90 => 6,
			Orientation::MirroredHorizontalAnd90CW => 7,
			Orientation::CW270 => 8,
		}
	}
}

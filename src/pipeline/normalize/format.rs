use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Image encodings recognized from magic bytes.
///
/// Only PNG, JPEG, BMP and TIFF are decoded. The rest are recognized so the
/// caller gets "unsupported format" rather than "corrupt file" for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    Gif,
    WebP,
    Heif,
    Ico,
}

impl ImageEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Heif => "heif",
            Self::Ico => "ico",
        }
    }

    /// File extension used when the original bytes are archived.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Tiff => "tiff",
            other => other.as_str(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.decoder_format().is_some()
    }

    /// Decoder to use for this encoding; `None` when it is not supported.
    pub fn decoder_format(&self) -> Option<ImageFormat> {
        match self {
            Self::Png => Some(ImageFormat::Png),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Bmp => Some(ImageFormat::Bmp),
            Self::Tiff => Some(ImageFormat::Tiff),
            Self::Gif | Self::WebP | Self::Heif | Self::Ico => None,
        }
    }

    /// Encodings that may carry an EXIF orientation tag.
    pub fn may_carry_exif(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Tiff)
    }
}

impl std::fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ISO-BMFF major brands of still images and image sequences.
const HEIF_BRANDS: &[[u8; 4]] = &[
    *b"heic", *b"heix", *b"hevc", *b"hevx", *b"heim", *b"heis", *b"mif1", *b"msf1", *b"avif",
    *b"avis",
];

/// Detect image encoding from magic bytes (NOT file extensions).
/// Returns `None` when the header matches no known image container.
pub fn detect_encoding(bytes: &[u8]) -> Option<ImageEncoding> {
    match bytes {
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageEncoding::Png),
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageEncoding::Jpeg),
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some(ImageEncoding::Tiff),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageEncoding::Gif),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageEncoding::WebP),
        // HEIC/HEIF/AVIF: "ftyp" box at offset 4 with an image major brand.
        // MP4/MOV share the box but carry video brands.
        [_, _, _, _, b'f', b't', b'y', b'p', b0, b1, b2, b3, ..]
            if HEIF_BRANDS.contains(&[*b0, *b1, *b2, *b3]) =>
        {
            Some(ImageEncoding::Heif)
        }
        [0x00, 0x00, 0x01, 0x00, ..] => Some(ImageEncoding::Ico),
        // BMP last: a two-byte signature is the weakest match
        [b'B', b'M', ..] => Some(ImageEncoding::Bmp),
        _ => None,
    }
}

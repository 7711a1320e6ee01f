//! Image normalization: raw upload bytes → canonical RGB pixel buffer.
//!
//! Pipeline flow:
//! 1. Validate bytes (size bounds)
//! 2. Detect encoding from magic bytes
//! 3. Decode with the matching decoder
//! 4. Fix EXIF rotation (JPEG/TIFF)
//! 5. Convert to RGB8
//! 6. Downscale so the longest edge fits `max_dimension`
//!
//! Pure transform: no I/O, no shared state. Identical bytes always produce a
//! bit-identical `NormalizedImage`.

pub mod format;

pub use format::*;

use std::borrow::Cow;
use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Shortest header any supported container can have.
const MIN_IMAGE_BYTES: usize = 8;

/// Default longest edge after normalization.
pub const DEFAULT_MAX_DIMENSION: u32 = 512;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Cannot decode image: {0}")]
    Decode(String),

    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: ImageEncoding },
}

// ═══════════════════════════════════════════════════════════
// NormalizedImage
// ═══════════════════════════════════════════════════════════

/// Colour space of a normalized buffer. Only sRGB is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Srgb,
}

/// Canonical in-memory image: 8-bit sRGB, three channels, bounded size.
///
/// No mutable access is exposed; once built the buffer never changes.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pixels: RgbImage,
    color_space: ColorSpace,
    source_encoding: Option<ImageEncoding>,
    original_width: u32,
    original_height: u32,
}

impl NormalizedImage {
    /// Wrap an already-canonical RGB buffer (synthetic or pre-decoded input).
    pub fn from_rgb(pixels: RgbImage) -> Self {
        let (w, h) = pixels.dimensions();
        Self {
            pixels,
            color_space: ColorSpace::Srgb,
            source_encoding: None,
            original_width: w,
            original_height: h,
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        3
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn source_encoding(&self) -> Option<ImageEncoding> {
        self.source_encoding
    }

    /// Dimensions after EXIF correction, before downscaling.
    pub fn original_dimensions(&self) -> (u32, u32) {
        (self.original_width, self.original_height)
    }

    pub fn summary(&self) -> NormalizationSummary {
        NormalizationSummary {
            width: self.width(),
            height: self.height(),
            channels: self.channels(),
            color_space: self.color_space,
            original_width: self.original_width,
            original_height: self.original_height,
            source_encoding: self.source_encoding,
        }
    }
}

/// Serializable description of a normalized image, without pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationSummary {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub color_space: ColorSpace,
    pub original_width: u32,
    pub original_height: u32,
    pub source_encoding: Option<ImageEncoding>,
}

// ═══════════════════════════════════════════════════════════
// ImageNormalizer
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    max_dimension: u32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl ImageNormalizer {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, NormalizeError> {
        // 1. Validate bytes
        validate_image_bytes(bytes)?;

        // 2. Detect encoding
        let encoding = detect_encoding(bytes).ok_or_else(|| {
            NormalizeError::Decode("Bytes are not a recognized image container".into())
        })?;
        let decoder = encoding
            .decoder_format()
            .ok_or(NormalizeError::UnsupportedFormat { format: encoding })?;

        // 3. Decode
        let img = image::load_from_memory_with_format(bytes, decoder)
            .map_err(|e| NormalizeError::Decode(format!("Failed to decode {encoding}: {e}")))?;

        // 4. Fix EXIF orientation
        let img = if encoding.may_carry_exif() {
            apply_orientation(img, read_exif_orientation(bytes))
        } else {
            img
        };
        let (orig_w, orig_h) = img.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(NormalizeError::Decode("Image has zero width or height".into()));
        }

        // 5. Convert to RGB
        let rgb = img.to_rgb8();

        // 6. Bound resolution
        let pixels = downscale_to_fit(&rgb, self.max_dimension).into_owned();

        debug!(
            encoding = %encoding,
            original = format!("{orig_w}x{orig_h}"),
            normalized = format!("{}x{}", pixels.width(), pixels.height()),
            "Image normalized"
        );

        Ok(NormalizedImage {
            pixels,
            color_space: ColorSpace::Srgb,
            source_encoding: Some(encoding),
            original_width: orig_w,
            original_height: orig_h,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
/// Rejects clearly invalid input before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), NormalizeError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(NormalizeError::Decode(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(NormalizeError::Decode(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Shrink so the longest edge is at most `max_dim`. Never upscales.
/// Uses `Cow` to avoid cloning when no downscale is needed.
fn downscale_to_fit(img: &RgbImage, max_dim: u32) -> Cow<'_, RgbImage> {
    let (w, h) = img.dimensions();
    let (new_w, new_h) = compute_fit_dimensions(w, h, max_dim);
    if (new_w, new_h) == (w, h) {
        return Cow::Borrowed(img);
    }
    Cow::Owned(image::imageops::resize(img, new_w, new_h, FilterType::Triangle))
}

/// Compute dimensions that fit inside a `max_dim` square while preserving
/// aspect ratio. Small images are NOT upscaled.
pub fn compute_fit_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }

    let scale = (max_dim as f32 / width as f32)
        .min(max_dim as f32 / height as f32)
        .min(1.0);

    let new_w = ((width as f32 * scale).round() as u32).clamp(1, max_dim.max(1));
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, max_dim.max(1));

    (new_w, new_h)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb};

    /// Encode a solid-colour image in the given container.
    pub(crate) fn encode_solid(
        width: u32,
        height: u32,
        color: [u8; 3],
        format: ImageOutputFormat,
    ) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, format)
            .unwrap();
        cursor.into_inner()
    }

    /// `ImageOutputFormat` has no TIFF variant in this `image` line.
    fn encode_tiff(img: &RgbImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        image::codecs::tiff::TiffEncoder::new(&mut cursor)
            .encode(img.as_raw(), img.width(), img.height(), image::ColorType::Rgb8)
            .unwrap();
        cursor.into_inner()
    }

    fn encode(img: &RgbImage, encoding: ImageEncoding) -> Vec<u8> {
        let format = match encoding {
            ImageEncoding::Tiff => return encode_tiff(img),
            ImageEncoding::Png => ImageOutputFormat::Png,
            ImageEncoding::Jpeg => ImageOutputFormat::Jpeg(90),
            ImageEncoding::Bmp => ImageOutputFormat::Bmp,
            other => panic!("no test encoder for {other}"),
        };
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut cursor, format)
            .unwrap();
        cursor.into_inner()
    }

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        encode_solid(width, height, color, ImageOutputFormat::Png)
    }

    // ── compute_fit_dimensions ──

    #[test]
    fn fit_landscape_bounds_longest_edge() {
        let (w, h) = compute_fit_dimensions(2000, 1000, 512);
        assert_eq!(w, 512);
        assert_eq!(h, 256);
    }

    #[test]
    fn fit_portrait_bounds_longest_edge() {
        let (w, h) = compute_fit_dimensions(600, 1200, 512);
        assert_eq!(h, 512);
        assert_eq!(w, 256);
    }

    #[test]
    fn fit_small_image_not_upscaled() {
        assert_eq!(compute_fit_dimensions(200, 300, 512), (200, 300));
    }

    #[test]
    fn fit_zero_dimensions_clamped() {
        let (w, h) = compute_fit_dimensions(0, 0, 512);
        assert!(w >= 1 && h >= 1);
    }

    // ── normalize ──

    #[test]
    fn png_normalizes_to_rgb() {
        let normalizer = ImageNormalizer::default();
        let img = normalizer.normalize(&png(40, 30, [20, 160, 40])).unwrap();
        assert_eq!(img.width(), 40);
        assert_eq!(img.height(), 30);
        assert_eq!(img.channels(), 3);
        assert_eq!(img.color_space(), ColorSpace::Srgb);
        assert_eq!(img.source_encoding(), Some(ImageEncoding::Png));
        assert_eq!(img.pixels().get_pixel(0, 0).0, [20, 160, 40]);
    }

    #[test]
    fn jpeg_and_bmp_are_supported() {
        let normalizer = ImageNormalizer::default();
        let jpeg = encode_solid(32, 32, [120, 80, 40], ImageOutputFormat::Jpeg(90));
        let bmp = encode_solid(32, 32, [120, 80, 40], ImageOutputFormat::Bmp);

        let from_jpeg = normalizer.normalize(&jpeg).unwrap();
        let from_bmp = normalizer.normalize(&bmp).unwrap();
        assert_eq!(from_jpeg.source_encoding(), Some(ImageEncoding::Jpeg));
        assert_eq!(from_bmp.source_encoding(), Some(ImageEncoding::Bmp));
        assert_eq!(from_bmp.pixels().get_pixel(5, 5).0, [120, 80, 40]);
    }

    #[test]
    fn tiff_is_supported() {
        let bytes = encode_tiff(&RgbImage::from_pixel(20, 10, Rgb([60, 40, 25])));
        let img = ImageNormalizer::default().normalize(&bytes).unwrap();
        assert_eq!(img.source_encoding(), Some(ImageEncoding::Tiff));
        assert_eq!((img.width(), img.height()), (20, 10));
        assert_eq!(img.pixels().get_pixel(7, 3).0, [60, 40, 25]);
    }

    #[test]
    fn oversized_image_is_bounded() {
        let normalizer = ImageNormalizer::new(64);
        let img = normalizer.normalize(&png(400, 200, [90, 60, 30])).unwrap();
        assert_eq!((img.width(), img.height()), (64, 32));
        assert_eq!(img.original_dimensions(), (400, 200));
    }

    #[test]
    fn normalization_is_deterministic_for_every_supported_encoding() {
        let normalizer = ImageNormalizer::new(48);
        let mut img = RgbImage::new(100, 70);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 2) as u8, (y * 3) as u8, ((x + y) % 256) as u8]);
        }

        for encoding in [
            ImageEncoding::Png,
            ImageEncoding::Jpeg,
            ImageEncoding::Bmp,
            ImageEncoding::Tiff,
        ] {
            let bytes = encode(&img, encoding);
            let a = normalizer.normalize(&bytes).unwrap();
            let b = normalizer.normalize(&bytes).unwrap();
            assert_eq!(a.source_encoding(), Some(encoding));
            assert_eq!((a.width(), a.height()), (48, 34), "{encoding}");
            assert_eq!(a.pixels().as_raw(), b.pixels().as_raw(), "{encoding}");
            assert_eq!(a.summary(), b.summary(), "{encoding}");
        }
    }

    #[test]
    fn too_small_input_is_decode_error() {
        let err = ImageNormalizer::default().normalize(&[0x89, 0x50]).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = ImageNormalizer::default()
            .normalize(b"this is definitely not an image file")
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }

    #[test]
    fn truncated_png_is_decode_error() {
        let bytes = png(20, 20, [1, 2, 3]);
        let err = ImageNormalizer::default()
            .normalize(&bytes[..bytes.len() / 2])
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }

    #[test]
    fn gif_is_unsupported_format() {
        let bytes = b"GIF89a\x0a\x00\x0a\x00\x00\x00\x00;".to_vec();
        let err = ImageNormalizer::default().normalize(&bytes).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::UnsupportedFormat {
                format: ImageEncoding::Gif
            }
        ));
    }

    #[test]
    fn exif_absent_returns_identity() {
        assert_eq!(read_exif_orientation(&png(10, 10, [128, 128, 128])), 1);
    }

    #[test]
    fn apply_orientation_rotations() {
        let make = || DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([1, 1, 1])));
        assert_eq!(apply_orientation(make(), 1).dimensions(), (10, 20));
        assert_eq!(apply_orientation(make(), 6).dimensions(), (20, 10));
        assert_eq!(apply_orientation(make(), 8).dimensions(), (20, 10));
        assert_eq!(apply_orientation(make(), 3).dimensions(), (10, 20));
        assert_eq!(apply_orientation(make(), 99).dimensions(), (10, 20));
    }

    #[test]
    fn synthetic_image_has_no_source_encoding() {
        let img = NormalizedImage::from_rgb(RgbImage::new(0, 0));
        assert_eq!(img.area(), 0);
        assert_eq!(img.source_encoding(), None);
    }
}

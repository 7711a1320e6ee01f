//! Colour and texture primitives shared by the classifier and both scorers.
//!
//! Every pixel is bucketed once into a `PixelClass` from its HSV values.
//! The resulting `ColorProfile` is the only thing downstream stages look at,
//! so classification and scoring agree on what "green" or "earthy" means.

use image::{GrayImage, Luma, RgbImage};

// ═══════════════════════════════════════════════════════════
// Thresholds
// ═══════════════════════════════════════════════════════════

/// Pixel-class boundaries on the HSV cone (hue in degrees, s/v in 0..1).
pub mod thresholds {
    /// Below this value a pixel is too dark for its hue to mean anything.
    pub const DARK_MAX_VALUE: f32 = 0.12;
    /// Washed-out pixels: crusts, glare, sky.
    pub const PALE_MAX_SATURATION: f32 = 0.12;
    pub const PALE_MIN_VALUE: f32 = 0.75;

    pub const VEGETATION_HUE: (f32, f32) = (70.0, 170.0);
    pub const VEGETATION_MIN_SATURATION: f32 = 0.20;
    pub const VEGETATION_MIN_VALUE: f32 = 0.15;

    pub const CHLOROTIC_HUE: (f32, f32) = (45.0, 70.0);
    pub const CHLOROTIC_MIN_SATURATION: f32 = 0.30;
    pub const CHLOROTIC_MIN_VALUE: f32 = 0.35;

    /// Earthy reds/oranges/browns wrap around 0 degrees.
    pub const BROWN_HUE_MAX: f32 = 50.0;
    pub const BROWN_HUE_WRAP_MIN: f32 = 330.0;
    pub const BROWN_MIN_SATURATION: f32 = 0.15;
    pub const BROWN_MIN_VALUE: f32 = 0.12;

    pub const GRAY_MAX_SATURATION: f32 = 0.15;

    /// Soil pixels darker than this count as organic-rich.
    pub const ORGANIC_MAX_VALUE: f32 = 0.40;

    /// Brown pixels within this many pixels (Chebyshev) of living tissue
    /// are read as necrotic leaf; browns further away are background.
    pub const NECROSIS_RADIUS: usize = 2;

    /// Central-difference gradient magnitude (|gx| + |gy|, 0..510) above
    /// which a pixel counts as an edge.
    pub const EDGE_GRADIENT_MIN: i32 = 48;
}

// ═══════════════════════════════════════════════════════════
// Pixel classes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelClass {
    Vegetation,
    Chlorotic,
    Brown,
    Dark,
    Pale,
    Gray,
    Other,
}

impl PixelClass {
    pub const COUNT: usize = 7;

    fn index(self) -> usize {
        self as usize
    }

    /// Classes that make up bare ground.
    pub fn is_soil_tone(self) -> bool {
        matches!(self, Self::Brown | Self::Dark | Self::Gray)
    }

    /// Living leaf tissue, healthy or yellowing.
    pub fn is_living(self) -> bool {
        matches!(self, Self::Vegetation | Self::Chlorotic)
    }
}

/// RGB (0..255) → HSV with hue in [0, 360) and saturation/value in [0, 1].
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
    (hue.rem_euclid(360.0), saturation, max)
}

/// Bucket one HSV triple. Checks run in a fixed order; first match wins.
pub fn classify_pixel(h: f32, s: f32, v: f32) -> PixelClass {
    use thresholds::*;

    if v < DARK_MAX_VALUE {
        return PixelClass::Dark;
    }
    if s < PALE_MAX_SATURATION && v > PALE_MIN_VALUE {
        return PixelClass::Pale;
    }
    if (VEGETATION_HUE.0..VEGETATION_HUE.1).contains(&h)
        && s >= VEGETATION_MIN_SATURATION
        && v >= VEGETATION_MIN_VALUE
    {
        return PixelClass::Vegetation;
    }
    if (CHLOROTIC_HUE.0..CHLOROTIC_HUE.1).contains(&h)
        && s >= CHLOROTIC_MIN_SATURATION
        && v >= CHLOROTIC_MIN_VALUE
    {
        return PixelClass::Chlorotic;
    }
    if (h < BROWN_HUE_MAX || h >= BROWN_HUE_WRAP_MIN)
        && s >= BROWN_MIN_SATURATION
        && v >= BROWN_MIN_VALUE
    {
        return PixelClass::Brown;
    }
    if s < GRAY_MAX_SATURATION {
        return PixelClass::Gray;
    }
    PixelClass::Other
}

// ═══════════════════════════════════════════════════════════
// ColorProfile
// ═══════════════════════════════════════════════════════════

/// Single-pass colour statistics of an RGB buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorProfile {
    total: u64,
    counts: [u64; PixelClass::COUNT],
    soil_pixels: u64,
    soil_value_sum: f64,
    soil_saturation_sum: f64,
    soil_dark_pixels: u64,
    tissue_pixels: u64,
    necrotic_pixels: u64,
    tissue_hue_sum: f64,
    tissue_hue_sum_sq: f64,
}

impl ColorProfile {
    /// Leaf tissue is living pixels plus the browns bordering them, so
    /// soil or bark around a plant is not counted as dead leaf.
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let mut profile = Self::default();

        let hsv: Vec<(PixelClass, f32, f32, f32)> = rgb
            .pixels()
            .map(|p| {
                let (h, s, v) = rgb_to_hsv(p.0);
                (classify_pixel(h, s, v), h, s, v)
            })
            .collect();
        let living: Vec<bool> = hsv.iter().map(|&(class, ..)| class.is_living()).collect();
        let near_living = dilate(
            &living,
            rgb.width() as usize,
            rgb.height() as usize,
            thresholds::NECROSIS_RADIUS,
        );

        for (i, &(class, h, s, v)) in hsv.iter().enumerate() {
            profile.total += 1;
            profile.counts[class.index()] += 1;

            if class.is_soil_tone() {
                profile.soil_pixels += 1;
                profile.soil_value_sum += v as f64;
                profile.soil_saturation_sum += s as f64;
                if v < thresholds::ORGANIC_MAX_VALUE {
                    profile.soil_dark_pixels += 1;
                }
            }

            let necrotic = class == PixelClass::Brown && near_living[i];
            if necrotic {
                profile.necrotic_pixels += 1;
            }

            if class.is_living() || necrotic {
                // Reds past 300 degrees sit next to browns, not next to blues.
                let hue = f64::from(if h >= 300.0 { h - 360.0 } else { h });
                profile.tissue_pixels += 1;
                profile.tissue_hue_sum += hue;
                profile.tissue_hue_sum_sq += hue * hue;
            }
        }

        profile
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, class: PixelClass) -> u64 {
        self.counts[class.index()]
    }

    /// Share of all pixels in `class`; 0 for an empty image.
    pub fn fraction(&self, class: PixelClass) -> f32 {
        ratio(self.count(class), self.total)
    }

    pub fn tissue_pixels(&self) -> u64 {
        self.tissue_pixels
    }

    /// Share of all pixels that read as leaf tissue.
    pub fn tissue_share(&self) -> f32 {
        ratio(self.tissue_pixels, self.total)
    }

    /// Share of all pixels that read as ground: soil tones plus pale crust.
    pub fn ground_share(&self) -> f32 {
        ratio(self.soil_pixels + self.count(PixelClass::Pale), self.total)
    }

    /// Brown pixels bordering living tissue.
    pub fn necrotic_pixels(&self) -> u64 {
        self.necrotic_pixels
    }

    pub fn soil_pixels(&self) -> u64 {
        self.soil_pixels
    }

    /// Mean HSV value over soil-tone pixels.
    pub fn soil_mean_value(&self) -> f32 {
        mean(self.soil_value_sum, self.soil_pixels)
    }

    /// Mean HSV saturation over soil-tone pixels.
    pub fn soil_mean_saturation(&self) -> f32 {
        mean(self.soil_saturation_sum, self.soil_pixels)
    }

    /// Share of soil-tone pixels darker than `ORGANIC_MAX_VALUE`.
    pub fn soil_dark_share(&self) -> f32 {
        ratio(self.soil_dark_pixels, self.soil_pixels)
    }

    /// Standard deviation of hue (degrees) over tissue pixels.
    pub fn tissue_hue_std(&self) -> f32 {
        if self.tissue_pixels == 0 {
            return 0.0;
        }
        let n = self.tissue_pixels as f64;
        let mean = self.tissue_hue_sum / n;
        let variance = (self.tissue_hue_sum_sq / n) - mean * mean;
        variance.max(0.0).sqrt() as f32
    }
}

/// Marks every cell within `radius` (Chebyshev distance) of a set cell.
/// Row pass then column pass.
fn dilate(mask: &[bool], width: usize, height: usize, radius: usize) -> Vec<bool> {
    let mut rows = vec![false; mask.len()];
    for y in 0..height {
        let row = &mask[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            rows[y * width + x] = row[lo..=hi].iter().any(|&m| m);
        }
    }

    let mut out = vec![false; mask.len()];
    for y in 0..height {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius).min(height - 1);
        for x in 0..width {
            out[y * width + x] = (lo..=hi).any(|yy| rows[yy * width + x]);
        }
    }
    out
}

fn ratio(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) as f32
    }
}

fn mean(sum: f64, n: u64) -> f32 {
    if n == 0 {
        0.0
    } else {
        (sum / n as f64) as f32
    }
}

// ═══════════════════════════════════════════════════════════
// Texture
// ═══════════════════════════════════════════════════════════

/// Convert RGB image to grayscale using BT.601 luminance.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let p = rgb.get_pixel(x, y);
            let luma = (0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32)
                .round()
                .min(255.0) as u8;
            gray.put_pixel(x, y, Luma([luma]));
        }
    }
    gray
}

/// Fraction of interior pixels whose central-difference gradient exceeds
/// `EDGE_GRADIENT_MIN`. Images narrower or shorter than 3px return 0.
pub fn edge_density(img: &GrayImage) -> f32 {
    let (w, h) = (img.width(), img.height());
    if w < 3 || h < 3 {
        return 0.0;
    }

    let at = |x: u32, y: u32| img.get_pixel(x, y).0[0] as i32;
    let mut edges = 0u64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = at(x + 1, y) - at(x - 1, y);
            let gy = at(x, y + 1) - at(x, y - 1);
            if gx.abs() + gy.abs() > thresholds::EDGE_GRADIENT_MIN {
                edges += 1;
            }
            count += 1;
        }
    }

    ratio(edges, count)
}

/// Standard deviation of grayscale intensity (0..~128).
pub fn luminance_contrast(img: &GrayImage) -> f32 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for pixel in img.pixels() {
        let val = pixel.0[0] as f64;
        sum += val;
        sum_sq += val * val;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    variance.max(0.0).sqrt() as f32
}

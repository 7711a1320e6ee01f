use tracing::debug;

use super::{build_card, record_features, ConditionBands, HealthScorer, ScoreCard, ScoringError};
use crate::models::SubjectType;
use crate::pipeline::features::{ColorProfile, PixelClass};
use crate::pipeline::normalize::NormalizedImage;

pub const LEAF_COLOR_UNIFORMITY: &str = "leaf_color_uniformity";
pub const NECROTIC_AREA_FRACTION: &str = "necrotic_area_fraction";
pub const CHLOROSIS_INDEX: &str = "chlorosis_index";
pub const GREEN_COVERAGE: &str = "green_coverage";

const FEATURE_KEYS: &[&str] = &[
    CHLOROSIS_INDEX,
    GREEN_COVERAGE,
    LEAF_COLOR_UNIFORMITY,
    NECROTIC_AREA_FRACTION,
];

/// Healthy ≥ 0.70 > Moderate Issues ≥ 0.40 > Unhealthy.
const BANDS: ConditionBands = ConditionBands {
    cutoffs: [0.70, 0.40],
    spread: 0.20,
};

/// Hue spread (degrees) at which uniformity reaches zero.
const HUE_SPREAD_CEILING: f32 = 60.0;

/// A quarter of the tissue dead or dying already counts as maximal damage.
const NECROSIS_SATURATION: f32 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct PlantHealthScorer;

impl PlantHealthScorer {
    pub fn new() -> Self {
        Self
    }
}

/// Plant measurements, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantFeatures {
    pub green_coverage: f32,
    pub necrotic_area_fraction: f32,
    pub chlorosis_index: f32,
    pub leaf_color_uniformity: f32,
}

impl PlantFeatures {
    /// Fractions are relative to leaf tissue (green + yellow + browns
    /// bordering them), so background pixels neither help nor hurt.
    pub fn from_profile(profile: &ColorProfile) -> Self {
        let veg = profile.count(PixelClass::Vegetation) as f32;
        let chlorotic = profile.count(PixelClass::Chlorotic) as f32;
        let necrotic = profile.necrotic_pixels() as f32;
        let tissue = veg + chlorotic + necrotic;

        if tissue == 0.0 {
            return Self {
                green_coverage: 0.0,
                necrotic_area_fraction: 0.0,
                chlorosis_index: 0.0,
                leaf_color_uniformity: 0.0,
            };
        }

        let living = veg + chlorotic;
        Self {
            green_coverage: veg / tissue,
            necrotic_area_fraction: necrotic / tissue,
            chlorosis_index: if living > 0.0 { chlorotic / living } else { 0.0 },
            leaf_color_uniformity: 1.0
                - (profile.tissue_hue_std() / HUE_SPREAD_CEILING).min(1.0),
        }
    }

    pub fn health_score(&self) -> f32 {
        let necrosis_penalty = (self.necrotic_area_fraction / NECROSIS_SATURATION).min(1.0);
        0.25 * self.green_coverage
            + 0.20 * self.leaf_color_uniformity
            + 0.40 * (1.0 - necrosis_penalty)
            + 0.15 * (1.0 - self.chlorosis_index)
    }
}

impl HealthScorer for PlantHealthScorer {
    fn subject(&self) -> SubjectType {
        SubjectType::Plant
    }

    fn feature_keys(&self) -> &'static [&'static str] {
        FEATURE_KEYS
    }

    fn score(&self, image: &NormalizedImage) -> Result<ScoreCard, ScoringError> {
        if image.area() == 0 {
            tracing::error!(subject = "plant", "Scoring called with an empty image");
            return Err(ScoringError::EmptyImage);
        }

        let profile = ColorProfile::from_rgb(image.pixels());
        let features = PlantFeatures::from_profile(&profile);
        let details = record_features(&[
            (CHLOROSIS_INDEX, features.chlorosis_index),
            (GREEN_COVERAGE, features.green_coverage),
            (LEAF_COLOR_UNIFORMITY, features.leaf_color_uniformity),
            (NECROTIC_AREA_FRACTION, features.necrotic_area_fraction),
        ])?;

        let card = build_card(
            SubjectType::Plant,
            &BANDS,
            features.health_score(),
            profile.tissue_share(),
            details,
        )?;
        debug!(
            health = card.health_score,
            evidence = card.evidence,
            condition = %card.condition,
            confidence = card.confidence,
            "Plant scored"
        );
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, PlantCondition};
    use image::{Rgb, RgbImage};

    const LEAF: [u8; 3] = [40, 160, 50];
    const YELLOW: [u8; 3] = [200, 190, 40];
    const NECROTIC: [u8; 3] = [90, 55, 30];

    /// 10x10 leaf with necrotic spots on 40% of it, two of every five
    /// pixels along each row.
    fn spotted() -> NormalizedImage {
        NormalizedImage::from_rgb(RgbImage::from_fn(10, 10, |x, y| {
            if (y * 10 + x) % 5 < 2 {
                Rgb(NECROTIC)
            } else {
                Rgb(LEAF)
            }
        }))
    }

    /// 10x10 image; the first `n_a` pixels are `a`, the rest `b`.
    fn mix(a: [u8; 3], n_a: u32, b: [u8; 3]) -> NormalizedImage {
        NormalizedImage::from_rgb(RgbImage::from_fn(10, 10, |x, y| {
            if y * 10 + x < n_a {
                Rgb(a)
            } else {
                Rgb(b)
            }
        }))
    }

    #[test]
    fn uniform_green_leaf_is_healthy_and_confident() {
        let card = PlantHealthScorer::new().score(&mix(LEAF, 100, LEAF)).unwrap();
        assert_eq!(card.condition, Condition::Plant(PlantCondition::Healthy));
        assert!(card.confidence >= 0.7);
        assert_eq!(card.details.get(NECROTIC_AREA_FRACTION), Some(0.0));
        assert_eq!(card.details.get(LEAF_COLOR_UNIFORMITY), Some(1.0));
    }

    #[test]
    fn heavy_necrosis_is_unhealthy() {
        let card = PlantHealthScorer::new().score(&spotted()).unwrap();
        assert_eq!(card.condition, Condition::Plant(PlantCondition::Unhealthy));
        assert!((card.details.get(NECROTIC_AREA_FRACTION).unwrap() - 0.4).abs() < 1e-3);
    }

    #[test]
    fn partial_yellowing_is_moderate() {
        // 60% chlorotic tissue: coverage .4, chlorosis .6, hue spread ~34deg
        let card = PlantHealthScorer::new().score(&mix(YELLOW, 60, LEAF)).unwrap();
        assert_eq!(
            card.condition,
            Condition::Plant(PlantCondition::ModerateIssues)
        );
    }

    #[test]
    fn details_hold_every_feature() {
        let scorer = PlantHealthScorer::new();
        let card = scorer.score(&mix(YELLOW, 30, LEAF)).unwrap();
        let keys: Vec<&str> = card.details.keys().collect();
        assert_eq!(keys, scorer.feature_keys());
    }

    #[test]
    fn no_tissue_scores_without_confidence() {
        let card = PlantHealthScorer::new()
            .score(&mix([30, 60, 200], 100, [30, 60, 200]))
            .unwrap();
        assert_eq!(card.condition.subject_type(), SubjectType::Plant);
        assert_eq!(card.evidence, 0.0);
        assert!(card.confidence <= 0.5);
    }

    #[test]
    fn soil_around_foliage_is_not_necrosis() {
        // Top 75% leaf over potting soil.
        let image = NormalizedImage::from_rgb(RgbImage::from_fn(48, 48, |_, y| {
            if y < 36 {
                Rgb(LEAF)
            } else {
                Rgb([110, 75, 45])
            }
        }));
        let card = PlantHealthScorer::new().score(&image).unwrap();
        assert_eq!(card.condition, Condition::Plant(PlantCondition::Healthy));
        assert!(card.details.get(NECROTIC_AREA_FRACTION).unwrap() < 0.1);
    }

    #[test]
    fn empty_image_is_an_error() {
        let err = PlantHealthScorer::new()
            .score(&NormalizedImage::from_rgb(RgbImage::new(0, 0)))
            .unwrap_err();
        assert_eq!(err, ScoringError::EmptyImage);
    }

    #[test]
    fn scoring_is_deterministic() {
        let image = mix(NECROTIC, 15, LEAF);
        let scorer = PlantHealthScorer::new();
        assert_eq!(scorer.score(&image).unwrap(), scorer.score(&image).unwrap());
    }
}

use tracing::debug;

use super::{build_card, record_features, ConditionBands, HealthScorer, ScoreCard, ScoringError};
use crate::models::SubjectType;
use crate::pipeline::features::{edge_density, rgb_to_gray, ColorProfile, PixelClass};
use crate::pipeline::normalize::NormalizedImage;

pub const MOISTURE_TONE_INDEX: &str = "moisture_tone_index";
pub const TEXTURE_GRANULARITY: &str = "texture_granularity";
pub const ORGANIC_DARKNESS_INDEX: &str = "organic_darkness_index";
pub const SURFACE_CRUST_FRACTION: &str = "surface_crust_fraction";

const FEATURE_KEYS: &[&str] = &[
    MOISTURE_TONE_INDEX,
    ORGANIC_DARKNESS_INDEX,
    SURFACE_CRUST_FRACTION,
    TEXTURE_GRANULARITY,
];

/// Good ≥ 0.60 > Fair ≥ 0.35 > Poor.
const BANDS: ConditionBands = ConditionBands {
    cutoffs: [0.60, 0.35],
    spread: 0.20,
};

/// Moisture tone of well-watered, not waterlogged, soil.
const MOISTURE_OPTIMUM: f32 = 0.60;

/// Edge density of a crumbly, aggregated surface.
const GRANULARITY_OPTIMUM: f32 = 0.30;

#[derive(Debug, Clone, Default)]
pub struct SoilHealthScorer;

impl SoilHealthScorer {
    pub fn new() -> Self {
        Self
    }
}

/// Soil measurements, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilFeatures {
    /// Darker, more saturated soil tones read as wetter.
    pub moisture_tone_index: f32,
    pub texture_granularity: f32,
    pub organic_darkness_index: f32,
    pub surface_crust_fraction: f32,
}

impl SoilFeatures {
    pub fn measure(profile: &ColorProfile, edge_density: f32) -> Self {
        let moisture_tone_index = if profile.soil_pixels() == 0 {
            0.0
        } else {
            0.65 * (1.0 - profile.soil_mean_value()) + 0.35 * profile.soil_mean_saturation()
        };

        Self {
            moisture_tone_index: moisture_tone_index.clamp(0.0, 1.0),
            texture_granularity: edge_density.clamp(0.0, 1.0),
            organic_darkness_index: profile.soil_dark_share(),
            surface_crust_fraction: profile.fraction(PixelClass::Pale),
        }
    }

    /// Balance terms peak at their optimum and fall off linearly on both sides.
    pub fn health_score(&self) -> f32 {
        let moisture_balance = peak(self.moisture_tone_index, MOISTURE_OPTIMUM);
        let structure = peak(self.texture_granularity, GRANULARITY_OPTIMUM);
        0.35 * self.organic_darkness_index
            + 0.30 * moisture_balance
            + 0.20 * structure
            + 0.15 * (1.0 - self.surface_crust_fraction)
    }
}

fn peak(value: f32, optimum: f32) -> f32 {
    (1.0 - (value - optimum).abs() / optimum).clamp(0.0, 1.0)
}

impl HealthScorer for SoilHealthScorer {
    fn subject(&self) -> SubjectType {
        SubjectType::Soil
    }

    fn feature_keys(&self) -> &'static [&'static str] {
        FEATURE_KEYS
    }

    fn score(&self, image: &NormalizedImage) -> Result<ScoreCard, ScoringError> {
        if image.area() == 0 {
            tracing::error!(subject = "soil", "Scoring called with an empty image");
            return Err(ScoringError::EmptyImage);
        }

        let profile = ColorProfile::from_rgb(image.pixels());
        let edges = edge_density(&rgb_to_gray(image.pixels()));
        let features = SoilFeatures::measure(&profile, edges);
        let details = record_features(&[
            (MOISTURE_TONE_INDEX, features.moisture_tone_index),
            (ORGANIC_DARKNESS_INDEX, features.organic_darkness_index),
            (SURFACE_CRUST_FRACTION, features.surface_crust_fraction),
            (TEXTURE_GRANULARITY, features.texture_granularity),
        ])?;

        let card = build_card(
            SubjectType::Soil,
            &BANDS,
            features.health_score(),
            profile.ground_share(),
            details,
        )?;
        debug!(
            health = card.health_score,
            evidence = card.evidence,
            condition = %card.condition,
            confidence = card.confidence,
            "Soil scored"
        );
        Ok(card)
    }
}

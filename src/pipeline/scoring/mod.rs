//! Health scorers: features → health score → condition band + confidence.

pub mod plant;
pub mod soil;

pub use plant::PlantHealthScorer;
pub use soil::SoilHealthScorer;

use thiserror::Error;

use super::normalize::NormalizedImage;
use crate::models::{Condition, FeatureDetails, SubjectType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Cannot score an image with zero area")]
    EmptyImage,

    #[error("Feature {feature} produced a non-finite value")]
    NonFiniteFeature { feature: &'static str },
}

/// Result of scoring one image against one subject's vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub condition: Condition,
    pub confidence: f32,
    /// Combined feature score in [0, 1]; higher is healthier.
    pub health_score: f32,
    /// Share of the image that shows the subject at all.
    pub evidence: f32,
    pub details: FeatureDetails,
}

/// Scores a normalized image for one subject type.
pub trait HealthScorer: Send + Sync {
    fn subject(&self) -> SubjectType;

    /// Keys every successful `score` puts in `details`, in order.
    fn feature_keys(&self) -> &'static [&'static str];

    fn score(&self, image: &NormalizedImage) -> Result<ScoreCard, ScoringError>;
}

// ═══════════════════════════════════════════════════════════
// Condition bands
// ═══════════════════════════════════════════════════════════

/// Subject coverage at which evidence stops limiting confidence.
pub const EVIDENCE_SATURATION: f32 = 0.5;

/// 0 with no subject pixels, 1 once `EVIDENCE_SATURATION` of the frame
/// shows the subject.
pub fn evidence_weight(share: f32) -> f32 {
    (share / EVIDENCE_SATURATION).clamp(0.0, 1.0)
}

/// Fixed descending cut-offs that split [0, 1] into one band per condition.
#[derive(Debug, Clone, Copy)]
pub struct ConditionBands {
    /// `cutoffs[i]` separates rank `i` from rank `i + 1`.
    pub cutoffs: [f32; 2],
    /// Distance from a cut-off at which confidence saturates at 1.0.
    pub spread: f32,
}

impl ConditionBands {
    /// Number of cut-offs the score falls below; 0 is the best band.
    pub fn rank(&self, health: f32) -> usize {
        self.cutoffs.iter().filter(|&&c| health < c).count()
    }

    /// 0.5 exactly on a cut-off, rising linearly to 1.0 at `spread` away.
    pub fn confidence(&self, health: f32) -> f32 {
        let distance = self
            .cutoffs
            .iter()
            .map(|c| (health - c).abs())
            .fold(f32::INFINITY, f32::min);
        0.5 + 0.5 * (distance / self.spread).min(1.0)
    }

    pub fn evaluate(&self, subject: SubjectType, health: f32) -> (Condition, f32) {
        (
            Condition::from_rank(subject, self.rank(health)),
            self.confidence(health),
        )
    }
}

/// Reject non-finite measurements, then record them in `details`.
pub(crate) fn record_features(
    features: &[(&'static str, f32)],
) -> Result<FeatureDetails, ScoringError> {
    let mut details = FeatureDetails::new();
    for &(name, value) in features {
        if !value.is_finite() {
            tracing::error!(feature = name, "Non-finite feature measurement");
            return Err(ScoringError::NonFiniteFeature { feature: name });
        }
        details.insert(name, value);
    }
    Ok(details)
}

/// Shared tail of both scorers: health score → `ScoreCard`.
///
/// Band confidence is scaled by `evidence_weight(evidence)`, so an image
/// that barely shows the subject cannot report a decisive verdict.
pub(crate) fn build_card(
    subject: SubjectType,
    bands: &ConditionBands,
    health: f32,
    evidence: f32,
    details: FeatureDetails,
) -> Result<ScoreCard, ScoringError> {
    if !health.is_finite() {
        tracing::error!(subject = %subject, "Non-finite health score");
        return Err(ScoringError::NonFiniteFeature {
            feature: "health_score",
        });
    }
    let health = health.clamp(0.0, 1.0);
    let evidence = if evidence.is_finite() { evidence.clamp(0.0, 1.0) } else { 0.0 };
    let (condition, band_confidence) = bands.evaluate(subject, health);
    Ok(ScoreCard {
        condition,
        confidence: band_confidence * evidence_weight(evidence),
        health_score: health,
        evidence,
        details,
    })
}

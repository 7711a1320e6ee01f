use serde::Serialize;
use tracing::debug;

use super::features::{edge_density, rgb_to_gray, ColorProfile, PixelClass};
use super::normalize::NormalizedImage;
use crate::models::SubjectType;

/// Neither score reaches this → not enough evidence for either subject.
pub const MIN_EVIDENCE: f32 = 0.30;

/// Scores closer than this are treated as a tie.
pub const TIE_MARGIN: f32 = 0.05;

/// Classifier outcome. `Undetermined` never reaches a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedSubject {
    Plant,
    Soil,
    Undetermined,
}

impl DetectedSubject {
    pub fn subject_type(&self) -> Option<SubjectType> {
        match self {
            Self::Plant => Some(SubjectType::Plant),
            Self::Soil => Some(SubjectType::Soil),
            Self::Undetermined => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub subject: DetectedSubject,
    pub plant_score: f32,
    pub soil_score: f32,
}

/// Decides plant vs soil from colour-class shares and edge density.
#[derive(Debug, Clone, Default)]
pub struct TypeClassifier;

impl TypeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Total: every image gets a classification, possibly `Undetermined`.
    pub fn classify(&self, image: &NormalizedImage) -> Classification {
        if image.area() == 0 {
            return Classification {
                subject: DetectedSubject::Undetermined,
                plant_score: 0.0,
                soil_score: 0.0,
            };
        }

        let profile = ColorProfile::from_rgb(image.pixels());
        let edges = edge_density(&rgb_to_gray(image.pixels()));
        let (plant_score, soil_score) = subject_scores(&profile, edges);
        let subject = decide(plant_score, soil_score);

        debug!(
            plant_score,
            soil_score,
            edge_density = edges,
            subject = ?subject,
            "Subject classified"
        );

        Classification {
            subject,
            plant_score,
            soil_score,
        }
    }
}

/// Evidence for each subject, both in [0, 1].
///
/// Plant: green tissue, with yellowing tissue counted at a discount.
/// Soil: earthy browns, dark and gray tones, with a bonus for grainy texture
/// scaled by how much of the frame is earth-toned.
pub fn subject_scores(profile: &ColorProfile, edge_density: f32) -> (f32, f32) {
    let veg = profile.fraction(PixelClass::Vegetation);
    let chlorotic = profile.fraction(PixelClass::Chlorotic);
    let brown = profile.fraction(PixelClass::Brown);
    let gray = profile.fraction(PixelClass::Gray);
    let dark = profile.fraction(PixelClass::Dark);

    let plant = veg + 0.7 * chlorotic;
    let earth = brown + gray + dark;
    let soil = 0.8 * brown + 0.2 * gray + 0.4 * dark + 0.15 * edge_density * earth;

    (plant.clamp(0.0, 1.0), soil.clamp(0.0, 1.0))
}

fn decide(plant_score: f32, soil_score: f32) -> DetectedSubject {
    if plant_score < MIN_EVIDENCE && soil_score < MIN_EVIDENCE {
        return DetectedSubject::Undetermined;
    }
    if (plant_score - soil_score).abs() < TIE_MARGIN {
        return DetectedSubject::Undetermined;
    }
    if plant_score > soil_score {
        DetectedSubject::Plant
    } else {
        DetectedSubject::Soil
    }
}

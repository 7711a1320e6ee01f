pub mod classify;
pub mod features;
pub mod normalize;
pub mod processor; // Analysis orchestrator: normalize → classify → score → record → backup
pub mod scoring;

use std::sync::LazyLock;

use serde::Serialize;
use thiserror::Error;

use crate::models::SubjectType;
use classify::TypeClassifier;
use normalize::{ImageEncoding, NormalizeError};
use scoring::{HealthScorer, PlantHealthScorer, ScoringError, SoilHealthScorer};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Image could not be decoded: {0}")]
    Decode(String),

    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: ImageEncoding },

    #[error(
        "Could not tell whether the image shows a plant or soil \
         (plant {plant_score:.2}, soil {soil_score:.2})"
    )]
    AmbiguousSubject { plant_score: f32, soil_score: f32 },

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),
}

/// What the caller should do after a failed analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectiveAction {
    /// Upload a different (or re-encoded) image.
    Reupload,
    /// Re-run with an explicit plant/soil selection.
    SelectSubjectManually,
    /// Internal fault; nothing the user can change.
    ReportDefect,
}

impl AnalysisError {
    pub fn corrective_action(&self) -> CorrectiveAction {
        match self {
            Self::Decode(_) | Self::UnsupportedFormat { .. } => CorrectiveAction::Reupload,
            Self::AmbiguousSubject { .. } => CorrectiveAction::SelectSubjectManually,
            Self::Scoring(_) => CorrectiveAction::ReportDefect,
        }
    }
}

impl From<NormalizeError> for AnalysisError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::Decode(msg) => Self::Decode(msg),
            NormalizeError::UnsupportedFormat { format } => Self::UnsupportedFormat { format },
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Detectors
// ═══════════════════════════════════════════════════════════

/// Classifier plus one scorer per subject. Immutable, shared process-wide.
pub struct Detectors {
    pub classifier: TypeClassifier,
    plant: PlantHealthScorer,
    soil: SoilHealthScorer,
}

impl Detectors {
    fn load() -> Self {
        tracing::debug!("Loading detectors");
        Self {
            classifier: TypeClassifier::new(),
            plant: PlantHealthScorer::new(),
            soil: SoilHealthScorer::new(),
        }
    }

    pub fn scorer_for(&self, subject: SubjectType) -> &dyn HealthScorer {
        match subject {
            SubjectType::Plant => &self.plant,
            SubjectType::Soil => &self.soil,
        }
    }
}

static DETECTORS: LazyLock<Detectors> = LazyLock::new(Detectors::load);

/// Process-wide detectors, built on first use.
pub fn detectors() -> &'static Detectors {
    &DETECTORS
}

//! Analysis orchestrator.
//!
//! Single entry point that drives one upload through the pipeline:
//! normalize → classify (auto only) → score → recommend → record → backup.
//!
//! Any failure before the record step aborts the run with nothing stored.
//! Backup problems never fail an analysis; they surface in the outcome and
//! in `BackupStatus`.

use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classify::Classification;
use super::normalize::{ImageNormalizer, NormalizationSummary, NormalizedImage};
use super::{detectors, AnalysisError};
use crate::backup::{BackupManager, BackupOutcome};
use crate::config::AnalysisConfig;
use crate::models::{AnalysisRecord, SubjectHint, SubjectType, Verdict};
use crate::recommendations;
use crate::session::AnalysisSession;

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// One upload to analyze.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub image_bytes: &'a [u8],
    /// Opaque display name (usually the uploaded file name).
    pub source_name: &'a str,
    pub hint: SubjectHint,
}

/// Everything a caller needs to present a finished analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub record: AnalysisRecord,
    /// 1-based position in the session history.
    pub position: usize,
    /// Present only when the subject was auto-detected.
    pub classification: Option<Classification>,
    pub normalization: NormalizationSummary,
    pub backup: BackupOutcome,
    /// Confidence fell below the configured display threshold.
    pub low_confidence: bool,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct HealthAnalyzer {
    config: AnalysisConfig,
    normalizer: ImageNormalizer,
    backup: Arc<BackupManager>,
}

impl HealthAnalyzer {
    /// Analyzer with a filesystem backup manager rooted at `config.backup_dir`.
    pub fn new(config: AnalysisConfig) -> Self {
        let backup = Arc::new(BackupManager::from_config(&config));
        Self::with_backup(config, backup)
    }

    pub fn with_backup(config: AnalysisConfig, backup: Arc<BackupManager>) -> Self {
        Self {
            normalizer: ImageNormalizer::new(config.max_dimension),
            config,
            backup,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn backup_manager(&self) -> &Arc<BackupManager> {
        &self.backup
    }

    /// Failures are logged here with their corrective action; nothing is
    /// recorded or backed up for them.
    pub fn analyze(
        &self,
        session: &AnalysisSession,
        request: AnalysisRequest<'_>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.run(session, request).map_err(|e| {
            warn!(
                session_id = %session.id(),
                source = request.source_name,
                corrective_action = ?e.corrective_action(),
                error = %e,
                "Analysis failed"
            );
            e
        })
    }

    fn run(
        &self,
        session: &AnalysisSession,
        request: AnalysisRequest<'_>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        // 1. Normalize
        let image = self.normalizer.normalize(request.image_bytes)?;

        // 2. Resolve subject
        let (subject, classification) = resolve_subject(&image, request.hint)?;

        // 3. Score
        let card = detectors().scorer_for(subject).score(&image)?;
        let verdict = Verdict::new(
            card.condition,
            card.confidence,
            card.details,
            request.source_name,
            Local::now().naive_local(),
        );

        // 4. Recommend
        let recommendations = recommendations::engine().recommend(&verdict);
        let record = AnalysisRecord::new(verdict, recommendations);

        // 5. Record
        let position = session.history().append(record.clone());

        // 6. Backup
        let backup = self.backup.backup(&record, request.image_bytes);

        let confidence = record.verdict().confidence();
        let low_confidence = confidence < self.config.display_threshold;

        info!(
            session_id = %session.id(),
            record_id = %record.id(),
            position,
            subject = %subject,
            condition = %record.verdict().condition(),
            confidence,
            low_confidence,
            backed_up = backup.is_stored(),
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            position,
            classification,
            normalization: image.summary(),
            backup,
            low_confidence,
            record,
        })
    }
}

/// Manual hints win; `Auto` runs the classifier and rejects ambiguity.
fn resolve_subject(
    image: &NormalizedImage,
    hint: SubjectHint,
) -> Result<(SubjectType, Option<Classification>), AnalysisError> {
    if let Some(subject) = hint.forced_subject() {
        debug!(subject = %subject, "Subject selected manually");
        return Ok((subject, None));
    }

    let classification = detectors().classifier.classify(image);
    match classification.subject.subject_type() {
        Some(subject) => Ok((subject, Some(classification))),
        None => Err(AnalysisError::AmbiguousSubject {
            plant_score: classification.plant_score,
            soil_score: classification.soil_score,
        }),
    }
}

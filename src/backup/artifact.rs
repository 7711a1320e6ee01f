use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::BackupError;
use crate::config::APP_VERSION;
use crate::models::{AnalysisRecord, Condition, FeatureDetails, ModelError, SubjectType};
use crate::pipeline::normalize::detect_encoding;

/// Sidecar format version.
pub const SIDECAR_VERSION: u32 = 1;

/// Name of the metadata file inside every artifact directory.
pub const SIDECAR_FILE: &str = "record.json";

/// Stem of the archived input file (`original.png`, `original.jpg`, ...).
pub const ORIGINAL_STEM: &str = "original";

/// Everything needed to audit one analysis without re-running it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSidecar {
    pub version: u32,
    pub artifact_id: String,
    pub record_id: String,
    pub subject_type: SubjectType,
    /// "Plant Health" / "Soil Health".
    pub analysis_type: String,
    pub condition: String,
    pub confidence: f32,
    pub details: FeatureDetails,
    pub recommendations: Vec<String>,
    pub timestamp: String,
    pub source_name: String,
    pub original_file: String,
    /// Base64 SHA-256 of the archived input bytes.
    pub original_sha256: String,
    pub original_size_bytes: u64,
    pub verdant_version: String,
}

impl BackupSidecar {
    /// Stored label read back into the subject's vocabulary.
    pub fn condition(&self) -> Result<Condition, ModelError> {
        Condition::parse(self.subject_type, &self.condition)
    }
}

/// A fully prepared artifact, ready to hand to a sink.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub id: String,
    pub sidecar: BackupSidecar,
    pub original: Vec<u8>,
}

impl BackupArtifact {
    pub fn new(record: &AnalysisRecord, original: &[u8]) -> Self {
        let verdict = record.verdict();
        let id = artifact_id(record);
        let extension = detect_encoding(original)
            .map(|e| e.extension())
            .unwrap_or("bin");
        let original_file = format!("{ORIGINAL_STEM}.{extension}");

        let sidecar = BackupSidecar {
            version: SIDECAR_VERSION,
            artifact_id: id.clone(),
            record_id: record.id().to_string(),
            subject_type: verdict.subject_type(),
            analysis_type: verdict.subject_type().analysis_label().to_string(),
            condition: verdict.condition().label().to_string(),
            confidence: verdict.confidence(),
            details: verdict.details().clone(),
            recommendations: record.recommendations().to_vec(),
            timestamp: verdict.timestamp_display(),
            source_name: verdict.source_name().to_string(),
            original_file,
            original_sha256: content_hash(original),
            original_size_bytes: original.len() as u64,
            verdant_version: APP_VERSION.to_string(),
        };

        Self {
            id,
            sidecar,
            original: original.to_vec(),
        }
    }
}

/// `analysis_<YYYYmmdd_HHMMSS_mmm>_<first 8 hex of record id>`.
///
/// Sorts chronologically by name; the id suffix keeps two analyses in the
/// same millisecond apart.
pub fn artifact_id(record: &AnalysisRecord) -> String {
    let stamp = record.verdict().timestamp().format("%Y%m%d_%H%M%S_%3f");
    let simple = record.id().simple().to_string();
    format!("analysis_{stamp}_{}", &simple[..8])
}

/// SHA-256 content hash, base64 encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

// ═══════════════════════════════════════════════════════════
// Sinks
// ═══════════════════════════════════════════════════════════

/// Durable destination for backup artifacts.
pub trait ArtifactSink: Send + Sync {
    /// Persist the artifact; returns where it landed.
    fn write(&self, artifact: &BackupArtifact) -> Result<PathBuf, BackupError>;
}

/// One directory per artifact under `root`.
///
/// Files are written into a hidden `.<id>.partial` directory and renamed
/// into place once both are synced, so `<root>/<id>` either exists complete
/// or not at all.
pub struct FsArtifactSink {
    root: PathBuf,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactSink for FsArtifactSink {
    fn write(&self, artifact: &BackupArtifact) -> Result<PathBuf, BackupError> {
        std::fs::create_dir_all(&self.root)?;

        let final_dir = self.root.join(&artifact.id);
        let staging = self.root.join(format!(".{}.partial", artifact.id));
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir(&staging)?;

        write_synced(
            &staging.join(&artifact.sidecar.original_file),
            &artifact.original,
        )?;
        let json = serde_json::to_vec_pretty(&artifact.sidecar)?;
        write_synced(&staging.join(SIDECAR_FILE), &json)?;

        std::fs::rename(&staging, &final_dir)?;
        Ok(final_dir)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), BackupError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

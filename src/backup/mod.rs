//! Durable per-analysis backups and the health status of the backup path.
//!
//! `BackupManager::backup` never fails from the caller's point of view: a
//! failed or timed-out write is recorded in `BackupStatus` and reported as
//! `BackupOutcome::Failed`, while the analysis itself stands.

pub mod artifact;
pub mod fs_helpers;

pub use artifact::{ArtifactSink, BackupArtifact, BackupSidecar, FsArtifactSink};

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::models::{AnalysisRecord, BackupState};

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sidecar serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backup write did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Backup worker exited without reporting a result")]
    WorkerLost,
}

/// Snapshot of backup health, returned by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupStatus {
    pub state: BackupState,
    pub last_backup_time: Option<NaiveDateTime>,
    pub attempts: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Writes that completed after their attempt had already timed out.
    /// They stay counted as failures.
    pub late_completions: u64,
}

impl BackupStatus {
    fn new(last_backup_time: Option<NaiveDateTime>) -> Self {
        Self {
            state: BackupState::Ok,
            last_backup_time,
            attempts: 0,
            failures: 0,
            consecutive_failures: 0,
            last_error: None,
            late_completions: 0,
        }
    }

    /// `YYYY-mm-dd HH:MM:SS`, or "never".
    pub fn last_backup_display(&self) -> String {
        self.last_backup_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".into())
    }
}

/// Result of one backup attempt, as seen by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupOutcome {
    Stored { artifact_id: String, path: PathBuf },
    /// On a timeout the worker thread is left running. If it later finishes,
    /// the complete artifact appears on disk and
    /// `BackupStatus::late_completions` is bumped; a hung write keeps its
    /// thread until the sink returns.
    Failed { reason: String },
}

impl BackupOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

// ═══════════════════════════════════════════════════════════
// BackupManager
// ═══════════════════════════════════════════════════════════

pub struct BackupManager {
    sink: Arc<dyn ArtifactSink>,
    root: Option<PathBuf>,
    status: Arc<RwLock<BackupStatus>>,
    timeout: Duration,
    failed_after: u32,
}

impl BackupManager {
    pub fn new(sink: Arc<dyn ArtifactSink>, timeout: Duration, failed_after: u32) -> Self {
        Self {
            sink,
            root: None,
            status: Arc::new(RwLock::new(BackupStatus::new(None))),
            timeout,
            failed_after: failed_after.max(1),
        }
    }

    /// Filesystem-backed manager; `last_backup_time` starts from the newest
    /// artifact already on disk.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let root = config.backup_dir.clone();
        Self {
            sink: Arc::new(FsArtifactSink::new(root.clone())),
            status: Arc::new(RwLock::new(BackupStatus::new(
                fs_helpers::latest_artifact_time(&root),
            ))),
            root: Some(root),
            timeout: config.backup_timeout(),
            failed_after: config.backup_failed_after.max(1),
        }
    }

    /// Artifact root, when backed by the filesystem.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Persist one record with its original bytes. Counts exactly one attempt.
    pub fn backup(&self, record: &AnalysisRecord, original: &[u8]) -> BackupOutcome {
        let artifact = BackupArtifact::new(record, original);
        let artifact_id = artifact.id.clone();

        match self.write_bounded(artifact) {
            Ok(path) => {
                self.record_success();
                tracing::debug!(artifact_id = %artifact_id, path = %path.display(), "Backup stored");
                BackupOutcome::Stored { artifact_id, path }
            }
            Err(e) => {
                let reason = e.to_string();
                let state = self.record_failure(&reason);
                tracing::warn!(
                    artifact_id = %artifact_id,
                    state = %state,
                    error = %reason,
                    "Backup failed"
                );
                BackupOutcome::Failed { reason }
            }
        }
    }

    pub fn get_status(&self) -> BackupStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run the sink on a worker thread and wait at most `timeout` for it.
    fn write_bounded(&self, artifact: BackupArtifact) -> Result<PathBuf, BackupError> {
        let (tx, rx) = mpsc::channel();
        let sink = Arc::clone(&self.sink);
        let status = Arc::clone(&self.status);

        thread::Builder::new()
            .name("verdant-backup".into())
            .spawn(move || {
                let result = sink.write(&artifact);
                // Receiver is gone once the caller timed out.
                if let Err(mpsc::SendError(Ok(path))) = tx.send(result) {
                    status
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .late_completions += 1;
                    tracing::warn!(
                        artifact_id = %artifact.id,
                        path = %path.display(),
                        "Backup finished after its timeout"
                    );
                }
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(BackupError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(BackupError::WorkerLost),
        }
    }

    fn record_success(&self) {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        status.attempts += 1;
        status.consecutive_failures = 0;
        status.state = BackupState::Ok;
        status.last_backup_time = Some(Local::now().naive_local());
    }

    fn record_failure(&self, reason: &str) -> BackupState {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        status.attempts += 1;
        status.failures += 1;
        status.consecutive_failures += 1;
        status.last_error = Some(reason.to_string());
        status.state = if status.consecutive_failures >= self.failed_after {
            BackupState::Failed
        } else {
            BackupState::Degraded
        };
        status.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, FeatureDetails, SoilCondition, Verdict};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn record() -> AnalysisRecord {
        AnalysisRecord::new(
            Verdict::new(
                Condition::Soil(SoilCondition::Fair),
                0.7,
                FeatureDetails::new(),
                "field.jpg",
                Local::now().naive_local(),
            ),
            vec!["Mulch bare surfaces to reduce evaporation and erosion.".into()],
        )
    }

    /// Always fails with an I/O error.
    struct FailingSink;

    impl ArtifactSink for FailingSink {
        fn write(&self, _: &BackupArtifact) -> Result<PathBuf, BackupError> {
            Err(BackupError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only volume",
            )))
        }
    }

    /// Succeeds, but only after longer than any test timeout.
    struct SlowSink;

    impl ArtifactSink for SlowSink {
        fn write(&self, _: &BackupArtifact) -> Result<PathBuf, BackupError> {
            thread::sleep(Duration::from_millis(200));
            Ok(PathBuf::from("/late"))
        }
    }

    /// Fails while `failing` is set; counts writes.
    struct FlakySink {
        failing: AtomicBool,
        writes: AtomicUsize,
    }

    impl ArtifactSink for FlakySink {
        fn write(&self, artifact: &BackupArtifact) -> Result<PathBuf, BackupError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(BackupError::WorkerLost)
            } else {
                Ok(PathBuf::from(&artifact.id))
            }
        }
    }

    fn config_in(dir: &Path) -> AnalysisConfig {
        AnalysisConfig {
            backup_dir: dir.join("backups"),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn fresh_manager_is_ok_with_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let status = BackupManager::from_config(&config_in(dir.path())).get_status();
        assert_eq!(status.state, BackupState::Ok);
        assert_eq!(status.last_backup_time, None);
        assert_eq!(status.attempts, 0);
        assert_eq!(status.last_backup_display(), "never");
    }

    #[test]
    fn successful_backup_writes_artifact_and_updates_status() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::from_config(&config_in(dir.path()));
        let before = Local::now().naive_local();

        let record = record();
        let outcome = manager.backup(&record, b"BM fake bitmap bytes");
        let BackupOutcome::Stored { artifact_id, path } = outcome else {
            panic!("expected stored outcome");
        };
        assert!(path.join(artifact::SIDECAR_FILE).is_file());

        let status = manager.get_status();
        assert_eq!(status.state, BackupState::Ok);
        assert_eq!(status.attempts, 1);
        assert!(status.last_backup_time.unwrap() >= before);

        let root = manager.root().unwrap();
        assert_eq!(fs_helpers::list_artifacts(root).unwrap(), vec![artifact_id.clone()]);
        let sidecar = fs_helpers::read_sidecar(root, &artifact_id).unwrap();
        assert_eq!(sidecar.record_id, record.id().to_string());
        assert_eq!(sidecar.original_file, "original.bmp");
    }

    #[test]
    fn failures_degrade_then_fail() {
        let manager = BackupManager::new(Arc::new(FailingSink), Duration::from_secs(5), 3);

        assert!(!manager.backup(&record(), b"x").is_stored());
        assert_eq!(manager.get_status().state, BackupState::Degraded);
        manager.backup(&record(), b"x");
        assert_eq!(manager.get_status().state, BackupState::Degraded);
        manager.backup(&record(), b"x");

        let status = manager.get_status();
        assert_eq!(status.state, BackupState::Failed);
        assert_eq!(status.attempts, 3);
        assert_eq!(status.failures, 3);
        assert_eq!(status.last_backup_time, None);
        assert!(status.last_error.unwrap().contains("read-only volume"));
    }

    #[test]
    fn success_restores_ok_and_keeps_failure_count() {
        let sink = Arc::new(FlakySink {
            failing: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
        });
        let manager = BackupManager::new(sink.clone(), Duration::from_secs(5), 2);
        manager.backup(&record(), b"x");
        manager.backup(&record(), b"x");
        assert_eq!(manager.get_status().state, BackupState::Failed);

        sink.failing.store(false, Ordering::SeqCst);
        assert!(manager.backup(&record(), b"x").is_stored());

        let status = manager.get_status();
        assert_eq!(status.state, BackupState::Ok);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.failures, 2);
        assert_eq!(status.attempts, 3);
        assert!(status.last_backup_time.is_some());
        assert_eq!(sink.writes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn slow_write_times_out_as_failure() {
        let manager = BackupManager::new(Arc::new(SlowSink), Duration::from_millis(20), 3);
        let outcome = manager.backup(&record(), b"x");
        match outcome {
            BackupOutcome::Failed { reason } => assert!(reason.contains("did not finish")),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(manager.get_status().state, BackupState::Degraded);
    }

    #[test]
    fn late_completion_is_recorded_without_clearing_failure() {
        let manager = BackupManager::new(Arc::new(SlowSink), Duration::from_millis(20), 3);
        assert!(!manager.backup(&record(), b"x").is_stored());
        assert_eq!(manager.get_status().late_completions, 0);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while manager.get_status().late_completions == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        let status = manager.get_status();
        assert_eq!(status.late_completions, 1);
        assert_eq!(status.failures, 1);
        assert_eq!(status.state, BackupState::Degraded);
        assert_eq!(status.last_backup_time, None);
    }

    #[test]
    fn existing_artifacts_seed_last_backup_time() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        BackupManager::from_config(&config).backup(&record(), b"x");

        let reopened = BackupManager::from_config(&config).get_status();
        assert!(reopened.last_backup_time.is_some());
        assert_eq!(reopened.attempts, 0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(BackupOutcome::Failed {
            reason: "disk full".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "disk full");
    }
}

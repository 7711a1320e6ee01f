use std::path::Path;

use chrono::NaiveDateTime;

use super::artifact::{BackupSidecar, SIDECAR_FILE};
use super::BackupError;

/// Completed artifact ids under `root`, oldest first.
/// Staging directories and stray files are skipped.
pub fn list_artifacts(root: &Path) -> Result<Vec<String>, BackupError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in std::fs::read_dir(root)?.flatten() {
        let path = entry.path();
        if !path.is_dir() || !path.join(SIDECAR_FILE).is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !name.starts_with('.') {
                ids.push(name.to_string());
            }
        }
    }
    // Ids start with a sortable timestamp.
    ids.sort();
    Ok(ids)
}

/// Read back the sidecar of one artifact.
pub fn read_sidecar(root: &Path, artifact_id: &str) -> Result<BackupSidecar, BackupError> {
    let raw = std::fs::read_to_string(root.join(artifact_id).join(SIDECAR_FILE))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Modification time of the most recent artifact, if any.
pub fn latest_artifact_time(root: &Path) -> Option<NaiveDateTime> {
    let ids = list_artifacts(root).ok()?;
    let mut latest: Option<NaiveDateTime> = None;

    for id in &ids {
        if let Ok(meta) = std::fs::metadata(root.join(id).join(SIDECAR_FILE)) {
            if let Ok(modified) = meta.modified() {
                let datetime: chrono::DateTime<chrono::Local> = modified.into();
                let naive = datetime.naive_local();
                if latest.is_none() || Some(naive) > latest {
                    latest = Some(naive);
                }
            }
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_artifact(root: &Path, id: &str) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SIDECAR_FILE), b"{}").unwrap();
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_artifacts(&dir.path().join("nope")).unwrap().is_empty());
        assert_eq!(latest_artifact_time(&dir.path().join("nope")), None);
    }

    #[test]
    fn lists_complete_artifacts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        make_artifact(dir.path(), "analysis_20260102_000000_000_bbbbbbbb");
        make_artifact(dir.path(), "analysis_20260101_000000_000_aaaaaaaa");
        make_artifact(dir.path(), ".analysis_20260103_000000_000_cccccccc.partial");
        std::fs::create_dir_all(dir.path().join("empty_dir")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let ids = list_artifacts(dir.path()).unwrap();
        assert_eq!(
            ids,
            vec![
                "analysis_20260101_000000_000_aaaaaaaa",
                "analysis_20260102_000000_000_bbbbbbbb"
            ]
        );
        assert!(latest_artifact_time(dir.path()).is_some());
    }

    #[test]
    fn reading_missing_sidecar_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_sidecar(dir.path(), "ghost"),
            Err(BackupError::Io(_))
        ));
    }

    #[test]
    fn reading_corrupt_sidecar_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        make_artifact(dir.path(), "broken");
        assert!(matches!(
            read_sidecar(dir.path(), "broken"),
            Err(BackupError::Json(_))
        ));
    }
}

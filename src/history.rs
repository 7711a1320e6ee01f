//! Append-only, in-memory history of completed analyses for one session.
//!
//! One `RwLock` guards the list: appends and `clear` take the write lock,
//! readers get a consistent snapshot under the read lock. A poisoned lock
//! is recovered rather than surfaced, since a panicking reader cannot leave
//! a `Vec` push half-done.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::models::{AnalysisRecord, SubjectType};

/// Number of records shown in the recent-analyses panel.
pub const SIDEBAR_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub plant: usize,
    pub soil: usize,
    /// Mean verdict confidence; 0 when the history is empty.
    pub mean_confidence: f32,
}

#[derive(Debug, Default)]
pub struct AnalysisHistory {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl AnalysisHistory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lock access ─────────────────────────────────────────

    fn read(&self) -> RwLockReadGuard<'_, Vec<AnalysisRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AnalysisRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Mutation ────────────────────────────────────────────

    /// Append a record; returns its 1-based position.
    pub fn append(&self, record: AnalysisRecord) -> usize {
        let mut records = self.write();
        records.push(record);
        records.len()
    }

    /// Drop every record at once. Readers see all or nothing.
    pub fn clear(&self) {
        let mut records = self.write();
        let dropped = records.len();
        records.clear();
        tracing::info!(dropped, "Analysis history cleared");
    }

    // ── Queries ─────────────────────────────────────────────

    /// Last `n` records, oldest first (the newest record is last).
    /// Fewer when the history is shorter.
    pub fn recent(&self, n: usize) -> Vec<AnalysisRecord> {
        let records = self.read();
        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }

    /// Full snapshot in insertion order.
    pub fn all(&self) -> Vec<AnalysisRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        let records = self.read();
        let count = |subject: SubjectType| {
            records
                .iter()
                .filter(|r| r.verdict().subject_type() == subject)
                .count()
        };
        let mean_confidence = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.verdict().confidence()).sum::<f32>() / records.len() as f32
        };

        HistoryStats {
            total: records.len(),
            plant: count(SubjectType::Plant),
            soil: count(SubjectType::Soil),
            mean_confidence,
        }
    }
}

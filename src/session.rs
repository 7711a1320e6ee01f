//! One analysis session: an id, a start time and its own history.
//!
//! Sessions are explicit values passed into the analyzer; nothing about a
//! session lives in global state. Dropping the session drops its history.

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

use crate::history::AnalysisHistory;

#[derive(Debug)]
pub struct AnalysisSession {
    id: Uuid,
    started_at: NaiveDateTime,
    history: AnalysisHistory,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Local::now().naive_local(),
            history: AnalysisHistory::new(),
        };
        tracing::debug!(session_id = %session.id, "Analysis session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    pub fn history(&self) -> &AnalysisHistory {
        &self.history
    }
}

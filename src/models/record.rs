use serde::Serialize;
use uuid::Uuid;

use super::verdict::Verdict;

/// A verdict plus its recommendations, as stored in session history.
///
/// Fields are private: records are created once by a successful pipeline
/// run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    id: Uuid,
    verdict: Verdict,
    recommendations: Vec<String>,
}

impl AnalysisRecord {
    pub fn new(verdict: Verdict, recommendations: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            verdict,
            recommendations,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

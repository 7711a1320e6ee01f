//! Rule-based recommendations for a finished verdict.
//!
//! Each subject type owns a static `RuleTable`: base advice keyed by
//! condition, then detail rules that fire on individual feature
//! measurements. Evaluation is pure and follows declaration order, so the
//! same verdict always yields the same list, most important first.

pub mod plant_rules;
pub mod soil_rules;

use std::sync::LazyLock;

use crate::models::{Condition, SubjectType, Verdict};

// ─── Rule types ──────────────────────────────────────────────────────────────

/// Predicate on one feature measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Below(f32),
    AtLeast(f32),
}

impl Trigger {
    pub fn matches(&self, value: f32) -> bool {
        match *self {
            Self::Below(limit) => value < limit,
            Self::AtLeast(limit) => value >= limit,
        }
    }
}

/// Advice that always applies to one condition.
#[derive(Debug)]
pub struct BaseRule {
    pub condition: Condition,
    pub advice: &'static [&'static str],
}

/// Advice that applies when one feature crosses a threshold.
#[derive(Debug)]
pub struct DetailRule {
    pub feature: &'static str,
    pub trigger: Trigger,
    pub advice: &'static [&'static str],
}

#[derive(Debug)]
pub struct RuleTable {
    pub subject: SubjectType,
    pub base: &'static [BaseRule],
    pub detail: &'static [DetailRule],
}

impl RuleTable {
    fn base_for(&self, condition: Condition) -> Option<&BaseRule> {
        self.base.iter().find(|rule| rule.condition == condition)
    }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct RecommendationEngine {
    tables: Vec<&'static RuleTable>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(vec![&plant_rules::PLANT_RULES, &soil_rules::SOIL_RULES])
    }
}

impl RecommendationEngine {
    pub fn new(tables: Vec<&'static RuleTable>) -> Self {
        Self { tables }
    }

    fn table_for(&self, subject: SubjectType) -> Option<&'static RuleTable> {
        self.tables.iter().copied().find(|t| t.subject == subject)
    }

    /// Ordered, de-duplicated advice for a verdict.
    pub fn recommend(&self, verdict: &Verdict) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |advice: &[&str]| {
            for line in advice {
                if !out.iter().any(|existing| existing == line) {
                    out.push((*line).to_string());
                }
            }
        };

        if let Some(table) = self.table_for(verdict.subject_type()) {
            if let Some(rule) = table.base_for(verdict.condition()) {
                push(rule.advice);
            }
            for rule in table.detail {
                let fired = verdict
                    .details()
                    .get(rule.feature)
                    .is_some_and(|value| rule.trigger.matches(value));
                if fired {
                    push(rule.advice);
                }
            }
        }

        if out.is_empty() {
            tracing::error!(
                subject = %verdict.subject_type(),
                condition = %verdict.condition(),
                "No recommendation rule covers this verdict"
            );
        }
        out
    }

    /// Conditions with no base rule (or a base rule with no advice).
    /// Empty when the tables are complete.
    pub fn missing_base_rules(&self) -> Vec<Condition> {
        SubjectType::ALL
            .iter()
            .flat_map(|subject| subject.vocabulary())
            .filter(|condition| {
                self.table_for(condition.subject_type())
                    .and_then(|table| table.base_for(*condition))
                    .map_or(true, |rule| rule.advice.is_empty())
            })
            .collect()
    }
}

static ENGINE: LazyLock<RecommendationEngine> = LazyLock::new(RecommendationEngine::default);

/// Process-wide engine over the built-in tables.
pub fn engine() -> &'static RecommendationEngine {
    &ENGINE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureDetails, PlantCondition, SoilCondition};
    use crate::pipeline::scoring::{plant, soil};

    fn verdict(condition: Condition, details: &[(&str, f32)]) -> Verdict {
        let mut d = FeatureDetails::new();
        for (k, v) in details {
            d.insert(k, *v);
        }
        let at = chrono::NaiveDate::from_ymd_opt(2026, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Verdict::new(condition, 0.9, d, "sample.png", at)
    }

    #[test]
    fn rule_tables_are_complete() {
        assert!(engine().missing_base_rules().is_empty());
    }

    #[test]
    fn every_label_gets_advice() {
        for subject in SubjectType::ALL {
            for condition in subject.vocabulary() {
                assert!(!engine().recommend(&verdict(condition, &[])).is_empty());
            }
        }
    }

    #[test]
    fn incomplete_table_is_reported() {
        static PARTIAL: RuleTable = RuleTable {
            subject: SubjectType::Plant,
            base: &[BaseRule {
                condition: Condition::Plant(PlantCondition::Healthy),
                advice: &["Keep going."],
            }],
            detail: &[],
        };
        let engine = RecommendationEngine::new(vec![&PARTIAL]);
        let missing = engine.missing_base_rules();
        assert!(missing.contains(&Condition::Plant(PlantCondition::Unhealthy)));
        assert!(missing.contains(&Condition::Soil(SoilCondition::Good)));
        assert!(!missing.contains(&Condition::Plant(PlantCondition::Healthy)));
        assert!(engine
            .recommend(&verdict(Condition::Soil(SoilCondition::Poor), &[]))
            .is_empty());
    }

    #[test]
    fn base_advice_comes_first() {
        let v = verdict(
            Condition::Plant(PlantCondition::Unhealthy),
            &[(plant::NECROTIC_AREA_FRACTION, 0.4)],
        );
        let recs = engine().recommend(&v);
        let base = plant_rules::PLANT_RULES
            .base_for(Condition::Plant(PlantCondition::Unhealthy))
            .unwrap();
        assert_eq!(&recs[..base.advice.len()], base.advice);
        assert!(recs.len() > base.advice.len());
    }

    #[test]
    fn detail_rules_fire_on_thresholds() {
        let quiet = verdict(
            Condition::Soil(SoilCondition::Fair),
            &[(soil::MOISTURE_TONE_INDEX, 0.6)],
        );
        let dry = verdict(
            Condition::Soil(SoilCondition::Fair),
            &[(soil::MOISTURE_TONE_INDEX, 0.2)],
        );
        assert!(engine().recommend(&dry).len() > engine().recommend(&quiet).len());
    }

    #[test]
    fn recommendations_are_deterministic_and_unique() {
        let v = verdict(
            Condition::Plant(PlantCondition::ModerateIssues),
            &[
                (plant::CHLOROSIS_INDEX, 0.6),
                (plant::GREEN_COVERAGE, 0.3),
                (plant::LEAF_COLOR_UNIFORMITY, 0.2),
                (plant::NECROTIC_AREA_FRACTION, 0.2),
            ],
        );
        let first = engine().recommend(&v);
        assert_eq!(first, engine().recommend(&v));
        let mut deduped = first.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), first.len());
    }

    #[test]
    fn triggers() {
        assert!(Trigger::Below(0.5).matches(0.49));
        assert!(!Trigger::Below(0.5).matches(0.5));
        assert!(Trigger::AtLeast(0.5).matches(0.5));
        assert!(!Trigger::AtLeast(0.5).matches(0.1));
    }
}

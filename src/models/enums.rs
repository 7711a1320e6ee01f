use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serializes as the `as_str` label so sidecars and exports stay readable.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(SubjectHint {
    Auto => "auto",
    Plant => "plant",
    Soil => "soil",
});

str_enum!(SubjectType {
    Plant => "plant",
    Soil => "soil",
});

// Condition vocabularies are declared best → worst; `ALL` order is the ranking.
str_enum!(PlantCondition {
    Healthy => "Healthy",
    ModerateIssues => "Moderate Issues",
    Unhealthy => "Unhealthy",
});

str_enum!(SoilCondition {
    Good => "Good",
    Fair => "Fair",
    Poor => "Poor",
});

str_enum!(Severity {
    Good => "good",
    Warning => "warning",
    Critical => "critical",
});

str_enum!(BackupState {
    Ok => "ok",
    Degraded => "degraded",
    Failed => "failed",
});

impl SubjectHint {
    /// The subject forced by a manual hint, `None` for auto-detect.
    pub fn forced_subject(&self) -> Option<SubjectType> {
        match self {
            Self::Auto => None,
            Self::Plant => Some(SubjectType::Plant),
            Self::Soil => Some(SubjectType::Soil),
        }
    }
}

impl SubjectType {
    /// Label used in the history "type" column.
    pub fn analysis_label(&self) -> &'static str {
        match self {
            Self::Plant => "Plant Health",
            Self::Soil => "Soil Health",
        }
    }

    /// Full condition vocabulary for this subject, best first.
    pub fn vocabulary(&self) -> Vec<Condition> {
        match self {
            Self::Plant => PlantCondition::ALL.iter().copied().map(Condition::Plant).collect(),
            Self::Soil => SoilCondition::ALL.iter().copied().map(Condition::Soil).collect(),
        }
    }
}

/// A condition label tied to the vocabulary of its subject type.
///
/// The subject is carried by the variant, so a plant label can never be
/// attached to a soil verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Plant(PlantCondition),
    Soil(SoilCondition),
}

impl Condition {
    pub fn subject_type(&self) -> SubjectType {
        match self {
            Self::Plant(_) => SubjectType::Plant,
            Self::Soil(_) => SubjectType::Soil,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Plant(c) => c.as_str(),
            Self::Soil(c) => c.as_str(),
        }
    }

    /// Position in the vocabulary ordering; 0 is the best condition.
    pub fn rank(&self) -> usize {
        match self {
            Self::Plant(c) => PlantCondition::ALL.iter().position(|v| v == c).unwrap_or(0),
            Self::Soil(c) => SoilCondition::ALL.iter().position(|v| v == c).unwrap_or(0),
        }
    }

    /// Condition at `rank` in a subject's vocabulary, clamped to the worst label.
    pub fn from_rank(subject: SubjectType, rank: usize) -> Self {
        match subject {
            SubjectType::Plant => {
                let idx = rank.min(PlantCondition::ALL.len() - 1);
                Self::Plant(PlantCondition::ALL[idx])
            }
            SubjectType::Soil => {
                let idx = rank.min(SoilCondition::ALL.len() - 1);
                Self::Soil(SoilCondition::ALL[idx])
            }
        }
    }

    /// Parse a label within a known subject's vocabulary.
    pub fn parse(subject: SubjectType, label: &str) -> Result<Self, ModelError> {
        match subject {
            SubjectType::Plant => label.parse().map(Self::Plant),
            SubjectType::Soil => label.parse().map(Self::Soil),
        }
    }

    /// Success / warning / error bucket used by callers when presenting.
    pub fn severity(&self) -> Severity {
        match self.rank() {
            0 => Severity::Good,
            1 => Severity::Warning,
            _ => Severity::Critical,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn subject_hint_round_trip() {
        for (variant, s) in [
            (SubjectHint::Auto, "auto"),
            (SubjectHint::Plant, "plant"),
            (SubjectHint::Soil, "soil"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(SubjectHint::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn plant_condition_round_trip() {
        for (variant, s) in [
            (PlantCondition::Healthy, "Healthy"),
            (PlantCondition::ModerateIssues, "Moderate Issues"),
            (PlantCondition::Unhealthy, "Unhealthy"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(PlantCondition::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn unknown_label_rejected() {
        let err = SoilCondition::from_str("Excellent").unwrap_err();
        assert!(err.to_string().contains("SoilCondition"));
    }

    #[test]
    fn hint_forces_subject() {
        assert_eq!(SubjectHint::Auto.forced_subject(), None);
        assert_eq!(SubjectHint::Plant.forced_subject(), Some(SubjectType::Plant));
        assert_eq!(SubjectHint::Soil.forced_subject(), Some(SubjectType::Soil));
    }

    #[test]
    fn condition_ranks_follow_vocabulary_order() {
        let plant = SubjectType::Plant.vocabulary();
        assert_eq!(plant.len(), 3);
        for (i, condition) in plant.iter().enumerate() {
            assert_eq!(condition.rank(), i);
            assert_eq!(Condition::from_rank(SubjectType::Plant, i), *condition);
        }
        assert_eq!(
            Condition::from_rank(SubjectType::Soil, 99),
            Condition::Soil(SoilCondition::Poor)
        );
    }

    #[test]
    fn condition_subject_matches_variant() {
        for condition in SubjectType::Soil.vocabulary() {
            assert_eq!(condition.subject_type(), SubjectType::Soil);
        }
        assert!(Condition::parse(SubjectType::Plant, "Good").is_err());
        assert_eq!(
            Condition::parse(SubjectType::Soil, "Good").unwrap(),
            Condition::Soil(SoilCondition::Good)
        );
    }

    #[test]
    fn severity_buckets() {
        assert_eq!(Condition::Plant(PlantCondition::Healthy).severity(), Severity::Good);
        assert_eq!(Condition::Soil(SoilCondition::Fair).severity(), Severity::Warning);
        assert_eq!(Condition::Plant(PlantCondition::Unhealthy).severity(), Severity::Critical);
    }

    #[test]
    fn backup_state_labels() {
        assert_eq!(BackupState::Degraded.to_string(), "degraded");
        assert_eq!(BackupState::from_str("failed").unwrap(), BackupState::Failed);
    }

    #[test]
    fn enums_serialize_as_labels() {
        let json = serde_json::to_string(&PlantCondition::ModerateIssues).unwrap();
        assert_eq!(json, "\"Moderate Issues\"");
        let back: SubjectType = serde_json::from_str("\"soil\"").unwrap();
        assert_eq!(back, SubjectType::Soil);
    }
}

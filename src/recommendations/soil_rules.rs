use super::{BaseRule, DetailRule, RuleTable, Trigger};
use crate::models::{Condition, SoilCondition, SubjectType};
use crate::pipeline::scoring::soil::{
    MOISTURE_TONE_INDEX, ORGANIC_DARKNESS_INDEX, SURFACE_CRUST_FRACTION, TEXTURE_GRANULARITY,
};

pub static SOIL_RULES: RuleTable = RuleTable {
    subject: SubjectType::Soil,
    base: &[
        BaseRule {
            condition: Condition::Soil(SoilCondition::Good),
            advice: &[
                "Keep adding compost or mulch each season to maintain organic matter.",
                "Rotate crops to preserve soil structure and nutrient balance.",
                "Avoid compacting the soil by working it only when it is not wet.",
            ],
        },
        BaseRule {
            condition: Condition::Soil(SoilCondition::Fair),
            advice: &[
                "Work 5-8 cm of well-rotted compost into the top layer.",
                "Mulch bare surfaces to reduce evaporation and erosion.",
                "Perform a laboratory soil test (pH, NPK, salinity) before the next planting.",
            ],
        },
        BaseRule {
            condition: Condition::Soil(SoilCondition::Poor),
            advice: &[
                "Perform a laboratory soil test (pH, NPK, salinity) before planting.",
                "Incorporate generous amounts of organic matter such as compost or manure.",
                "Sow a cover crop to rebuild structure and protect the surface.",
                "Check drainage and correct standing water or hardpan layers.",
            ],
        },
    ],
    detail: &[
        DetailRule {
            feature: MOISTURE_TONE_INDEX,
            trigger: Trigger::Below(0.35),
            advice: &[
                "The surface looks dry; irrigate deeply and less often to reach the root zone.",
            ],
        },
        DetailRule {
            feature: MOISTURE_TONE_INDEX,
            trigger: Trigger::AtLeast(0.85),
            advice: &[
                "The soil looks waterlogged; reduce irrigation and improve drainage.",
            ],
        },
        DetailRule {
            feature: ORGANIC_DARKNESS_INDEX,
            trigger: Trigger::Below(0.30),
            advice: &[
                "Low organic matter is likely; add compost, leaf mold or aged manure.",
            ],
        },
        DetailRule {
            feature: TEXTURE_GRANULARITY,
            trigger: Trigger::Below(0.05),
            advice: &[
                "The surface looks compacted or smooth; loosen it with a fork and avoid heavy traffic.",
            ],
        },
        DetailRule {
            feature: SURFACE_CRUST_FRACTION,
            trigger: Trigger::AtLeast(0.20),
            advice: &[
                "Break up the surface crust and mulch to prevent it from re-forming.",
                "Pale crusts can indicate salt buildup; flush with clean water and test salinity.",
            ],
        },
    ],
};

use super::{BaseRule, DetailRule, RuleTable, Trigger};
use crate::models::{Condition, PlantCondition, SubjectType};
use crate::pipeline::scoring::plant::{
    CHLOROSIS_INDEX, GREEN_COVERAGE, LEAF_COLOR_UNIFORMITY, NECROTIC_AREA_FRACTION,
};

pub static PLANT_RULES: RuleTable = RuleTable {
    subject: SubjectType::Plant,
    base: &[
        BaseRule {
            condition: Condition::Plant(PlantCondition::Healthy),
            advice: &[
                "Maintain the current watering and fertilization schedule.",
                "Keep inspecting leaves weekly so early changes are caught.",
                "Rotate the plant periodically for even light exposure.",
            ],
        },
        BaseRule {
            condition: Condition::Plant(PlantCondition::ModerateIssues),
            advice: &[
                "Check soil moisture before watering and avoid both drought and overwatering.",
                "Inspect the undersides of leaves for pests such as aphids or spider mites.",
                "Apply a balanced fertilizer at half strength if the plant has not been fed recently.",
                "Re-photograph the plant in a few days to track whether symptoms spread.",
            ],
        },
        BaseRule {
            condition: Condition::Plant(PlantCondition::Unhealthy),
            advice: &[
                "Isolate the plant from healthy plants to prevent possible spread of disease.",
                "Prune dead or heavily damaged leaves with sterilized tools.",
                "Check the roots for rot and repot in fresh, well-draining soil if needed.",
                "Consult a local extension service or plant pathologist for a diagnosis.",
            ],
        },
    ],
    detail: &[
        DetailRule {
            feature: NECROTIC_AREA_FRACTION,
            trigger: Trigger::AtLeast(0.10),
            advice: &[
                "Remove brown or necrotic tissue and dispose of it away from the garden.",
                "Avoid overhead watering to limit fungal and bacterial leaf spot.",
            ],
        },
        DetailRule {
            feature: CHLOROSIS_INDEX,
            trigger: Trigger::AtLeast(0.25),
            advice: &[
                "Yellowing suggests a nitrogen, iron or magnesium deficiency; consider a soil nutrient test.",
                "Make sure the pot or bed drains well, since waterlogged roots also cause yellowing.",
            ],
        },
        DetailRule {
            feature: LEAF_COLOR_UNIFORMITY,
            trigger: Trigger::Below(0.50),
            advice: &["Look for patchy discoloration, which often points to pests or localized infection."],
        },
        DetailRule {
            feature: GREEN_COVERAGE,
            trigger: Trigger::Below(0.50),
            advice: &["Increase light exposure gradually if the plant receives less than six hours of light."],
        },
    ],
};

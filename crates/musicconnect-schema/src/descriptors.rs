//! Response schemas sent to the generation endpoint.
//!
//! Uses the OpenAPI subset accepted by `generationConfig.responseSchema`:
//! upper-case type names, `enum` for closed string sets and `required` lists.

use serde_json::{json, Value};

use crate::Difficulty;

pub const SUMMARY_REQUIRED_FIELDS: [&str; 7] = [
    "id",
    "title",
    "description",
    "tags",
    "duration",
    "difficulty",
    "impactArea",
];

pub const DETAIL_REQUIRED_FIELDS: [&str; 5] = [
    "title",
    "fullDescription",
    "objectives",
    "stepByStepPlan",
    "requiredEquipment",
];

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

pub fn activity_summary_schema() -> Value {
    let difficulties: Vec<&str> = Difficulty::ALL.iter().map(|d| d.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "id": { "type": "STRING" },
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "tags": string_list(),
            "duration": { "type": "STRING" },
            "difficulty": { "type": "STRING", "enum": difficulties },
            "impactArea": { "type": "STRING" },
        },
        "required": SUMMARY_REQUIRED_FIELDS,
    })
}

pub fn activity_summary_list_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": activity_summary_schema(),
    })
}

pub fn activity_detail_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "fullDescription": { "type": "STRING" },
            "objectives": string_list(),
            "targetAudienceDetail": { "type": "STRING" },
            "stepByStepPlan": string_list(),
            "requiredEquipment": string_list(),
            "budgetEstimate": { "type": "STRING" },
            "evaluationMetrics": string_list(),
        },
        "required": DETAIL_REQUIRED_FIELDS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_list_is_array_of_objects_with_all_fields_required() {
        let schema = activity_summary_list_schema();
        assert_eq!(schema["type"], "ARRAY");
        let items = &schema["items"];
        assert_eq!(items["type"], "OBJECT");
        let required = items["required"].as_array().unwrap();
        assert_eq!(required.len(), 7);
        for field in SUMMARY_REQUIRED_FIELDS {
            assert!(items["properties"][field].is_object(), "missing {field}");
        }
    }

    #[test]
    fn difficulty_is_constrained_to_three_values() {
        let schema = activity_summary_schema();
        assert_eq!(
            schema["properties"]["difficulty"]["enum"],
            json!(["Low", "Medium", "High"])
        );
    }

    #[test]
    fn detail_schema_requests_optional_fields_without_requiring_them() {
        let schema = activity_detail_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, DETAIL_REQUIRED_FIELDS);
        for lenient in ["targetAudienceDetail", "budgetEstimate", "evaluationMetrics"] {
            assert!(schema["properties"][lenient].is_object());
            assert!(!required.contains(&lenient));
        }
        assert_eq!(schema["properties"]["stepByStepPlan"]["items"]["type"], "STRING");
    }
}

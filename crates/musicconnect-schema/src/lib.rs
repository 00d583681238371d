pub mod descriptors;
pub mod target_groups;

pub use descriptors::*;
pub use target_groups::*;

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Deserializer, Serialize};

/// How much preparation an idea needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Medium, Difficulty::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Low => "Low",
            Difficulty::Medium => "Medium",
            Difficulty::High => "High",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Idea card returned by the idea-list generation.
///
/// `id` is only unique inside the batch it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub duration: String,
    pub difficulty: Difficulty,
    pub impact_area: String,
}

/// Full activity proposal.
///
/// The endpoint occasionally drops `targetAudienceDetail`, `budgetEstimate` and
/// `evaluationMetrics`; those default to empty when missing or null.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetail {
    pub title: String,
    pub full_description: String,
    pub objectives: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_audience_detail: String,
    pub step_by_step_plan: Vec<String>,
    pub required_equipment: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub budget_estimate: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evaluation_metrics: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A proposal kept in the saved collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedActivity {
    #[serde(flatten)]
    pub detail: ActivityDetail,
    pub id: String,
    /// Epoch milliseconds.
    pub saved_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group_label: Option<String>,
}

impl SavedActivity {
    pub fn title(&self) -> &str {
        &self.detail.title
    }
}

/// Editable field of an [`ActivityDetail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Title,
    FullDescription,
    Objectives,
    TargetAudienceDetail,
    StepByStepPlan,
    RequiredEquipment,
    BudgetEstimate,
    EvaluationMetrics,
}

impl DetailField {
    pub const ALL: [DetailField; 8] = [
        DetailField::Title,
        DetailField::FullDescription,
        DetailField::Objectives,
        DetailField::TargetAudienceDetail,
        DetailField::StepByStepPlan,
        DetailField::RequiredEquipment,
        DetailField::BudgetEstimate,
        DetailField::EvaluationMetrics,
    ];

    /// JSON name of the field.
    pub fn name(self) -> &'static str {
        match self {
            DetailField::Title => "title",
            DetailField::FullDescription => "fullDescription",
            DetailField::Objectives => "objectives",
            DetailField::TargetAudienceDetail => "targetAudienceDetail",
            DetailField::StepByStepPlan => "stepByStepPlan",
            DetailField::RequiredEquipment => "requiredEquipment",
            DetailField::BudgetEstimate => "budgetEstimate",
            DetailField::EvaluationMetrics => "evaluationMetrics",
        }
    }

    fn alias(self) -> &'static str {
        match self {
            DetailField::Title => "title",
            DetailField::FullDescription => "description",
            DetailField::Objectives => "objectives",
            DetailField::TargetAudienceDetail => "audience",
            DetailField::StepByStepPlan => "steps",
            DetailField::RequiredEquipment => "equipment",
            DetailField::BudgetEstimate => "budget",
            DetailField::EvaluationMetrics => "metrics",
        }
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            DetailField::Objectives
                | DetailField::StepByStepPlan
                | DetailField::RequiredEquipment
                | DetailField::EvaluationMetrics
        )
    }
}

impl FromStr for DetailField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        DetailField::ALL
            .into_iter()
            .find(|field| {
                field.name().eq_ignore_ascii_case(needle) || field.alias().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| anyhow!("unknown detail field: {s}"))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

impl ActivityDetail {
    /// Overwrites one field from user text. List fields split on `;` or newlines.
    pub fn set_field(&mut self, field: DetailField, raw: &str) {
        match field {
            DetailField::Title => self.title = raw.to_owned(),
            DetailField::FullDescription => self.full_description = raw.to_owned(),
            DetailField::TargetAudienceDetail => self.target_audience_detail = raw.to_owned(),
            DetailField::BudgetEstimate => self.budget_estimate = raw.to_owned(),
            DetailField::Objectives => self.objectives = split_list(raw),
            DetailField::StepByStepPlan => self.step_by_step_plan = split_list(raw),
            DetailField::RequiredEquipment => self.required_equipment = split_list(raw),
            DetailField::EvaluationMetrics => self.evaluation_metrics = split_list(raw),
        }
    }
}

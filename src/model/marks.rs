use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Display, EnumString, Serialize, Deserialize, ToSchema)]
pub enum AssessmentType {
    Test,
    Quiz,
    #[strum(serialize = "Mid Term")]
    #[serde(rename = "Mid Term")]
    MidTerm,
    Final,
    #[default]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Marks {
    pub id: u64,
    pub student_id: u64,
    pub teacher_id: u64,
    pub subject_id: u64,
    pub assessment_type: AssessmentType,
    pub topic: String,
    pub date: DateTime<Utc>,
    pub obtained_marks: f64,
    pub total_marks: f64,
}

#[derive(Debug, Clone)]
pub struct NewMarks {
    pub student_id: u64,
    pub teacher_id: u64,
    pub subject_id: u64,
    pub assessment_type: AssessmentType,
    pub topic: String,
    pub date: DateTime<Utc>,
    pub obtained_marks: f64,
    pub total_marks: f64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarksPatch {
    pub obtained_marks: Option<f64>,
    pub total_marks: Option<f64>,
    pub topic: Option<String>,
    pub assessment_type: Option<AssessmentType>,
    pub date: Option<DateTime<Utc>>,
}

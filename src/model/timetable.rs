use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Declaration order is calendar order, so sorting by day is Monday first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, EnumString, Serialize, Deserialize, ToSchema)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: u64,
    pub school_id: u64,
    pub class_id: u64,
    pub day: Weekday,
    pub period_number: i32,
    pub subject_id: u64,
    pub teacher_id: Option<u64>,
}

/// Requested assignment of a subject (and optionally a teacher) to one slot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub class_id: u64,
    pub day: Weekday,
    pub period_number: i32,
    #[serde(alias = "subject")]
    pub subject_id: u64,
    pub teacher_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetablePatch {
    pub day: Option<Weekday>,
    pub period_number: Option<i32>,
    #[serde(alias = "subject")]
    pub subject_id: Option<u64>,
    pub teacher_id: Option<u64>,
}

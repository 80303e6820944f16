use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub school_id: u64,
    /// Subjects this teacher teaches.
    pub teach_subject: Vec<u64>,
    /// Classes this teacher teaches in.
    pub teach_sclass: Vec<u64>,
    /// Homeroom class. At most one teacher per class within a school.
    pub class_teacher_of: Option<u64>,
    pub father_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub password: String,
    pub school_id: u64,
    pub teach_subject: Vec<u64>,
    pub teach_sclass: Vec<u64>,
    pub father_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<String>,
    pub address: Option<String>,
}

/// Profile fields a teacher record may have changed; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
}

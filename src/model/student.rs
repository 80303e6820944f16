use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub subject_id: u64,
    pub marks_obtained: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: u64,
    pub name: String,
    pub father_name: String,
    pub email: String,
    /// Unique within (school, class).
    pub roll_num: i32,
    #[schema(value_type = String, format = "date")]
    pub dob: NaiveDate,
    pub phone_number: String,
    pub emergency_contact: String,
    pub address: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub sclass_id: u64,
    pub school_id: u64,
    pub exam_result: Vec<ExamResult>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub father_name: String,
    pub email: String,
    pub roll_num: i32,
    pub dob: NaiveDate,
    pub phone_number: String,
    pub emergency_contact: String,
    pub address: String,
    pub password: String,
    pub sclass_id: u64,
    pub school_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub email: Option<String>,
    pub roll_num: Option<i32>,
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<String>,
    pub address: Option<String>,
    /// Already hashed.
    pub password: Option<String>,
    pub sclass_id: Option<u64>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.father_name.is_none()
            && self.email.is_none()
            && self.roll_num.is_none()
            && self.dob.is_none()
            && self.phone_number.is_none()
            && self.emergency_contact.is_none()
            && self.address.is_none()
            && self.password.is_none()
            && self.sclass_id.is_none()
    }
}

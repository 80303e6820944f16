use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: u64,
    pub sub_name: String,
    pub sub_code: Option<String>,
    pub sessions: Option<i32>,
    pub sclass_id: u64,
    pub school_id: u64,
    /// Teacher currently teaching this subject, if any.
    pub teacher_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub sub_name: String,
    pub sub_code: Option<String>,
    pub sessions: Option<i32>,
    pub sclass_id: u64,
    pub school_id: u64,
}

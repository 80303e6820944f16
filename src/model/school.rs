use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tenant root. Every admin account owns exactly one school.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: u64,
    pub school_name: String,
}

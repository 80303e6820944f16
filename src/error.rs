use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::service::cascade::CascadeReport;
use crate::store::{StoreError, keys};

/// Error taxonomy shared by every handler and service.
///
/// `Display` is the human readable message sent to the caller, except for
/// `Internal` which never leaks detail.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    Auth(String),
    #[display(fmt = "{}", _0)]
    PartialCascade(CascadeReport),
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        ApiError::Auth(msg.into())
    }

    /// Stable machine readable kind, part of every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFoundError",
            ApiError::Conflict(_) => "ConflictError",
            ApiError::Forbidden(_) => "ForbiddenError",
            ApiError::Auth(_) => "AuthError",
            ApiError::PartialCascade(_) => "PartialCascadeError",
            ApiError::Internal => "ServerError",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::PartialCascade(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::PartialCascade(report) => json!({
                "kind": self.kind(),
                "message": self.to_string(),
                "completed": report.completed,
                "failedStep": report.failed,
            }),
            _ => json!({
                "kind": self.kind(),
                "message": self.to_string(),
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Duplicate-key rejections become conflicts with a message per unique index;
/// everything else is logged and hidden behind a generic server error.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => ApiError::Conflict(conflict_message(&key).to_string()),
            other => {
                tracing::error!(error = %other, "Store failure");
                ApiError::Internal
            }
        }
    }
}

fn conflict_message(key: &str) -> &'static str {
    match key {
        keys::ADMIN_EMAIL | keys::TEACHER_EMAIL | keys::STUDENT_EMAIL => "Email already exists",
        keys::SCHOOL_NAME => "School name already exists",
        keys::CLASS_NAME => "Sorry this class name already exists",
        keys::CLASS_TEACHER => "A class teacher is already assigned to this class.",
        keys::STUDENT_ROLL => "Roll Number already exists in this class",
        keys::TIMETABLE_SLOT => "This timetable slot is already taken",
        keys::SUBMISSION_STUDENT => "Homework already submitted",
        keys::ATTENDANCE_DAY => "Attendance already recorded for this day",
        _ => "Duplicate entry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn duplicate_key_becomes_conflict_with_index_message() {
        let err: ApiError = StoreError::Duplicate(keys::STUDENT_ROLL.to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Roll Number already exists in this class");

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["kind"], "ConflictError");
    }

    #[test]
    fn backend_failures_do_not_leak_detail() {
        let err: ApiError = StoreError::Unavailable("lock poisoned at tables".into()).into();
        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

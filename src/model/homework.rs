use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize, Deserialize, ToSchema)]
pub enum HomeworkStatus {
    Active,
    Completed,
    Overdue,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize, Deserialize, ToSchema)]
pub enum SubmissionStatus {
    Submitted,
    Graded,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub student_id: u64,
    pub submitted_at: DateTime<Utc>,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    /// Fixed when the submission is written; never recomputed.
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Subject name, e.g. "Islamiyat".
    pub subject: String,
    /// Class name, e.g. "4B".
    pub sclass: String,
    pub school_id: u64,
    pub teacher_id: u64,
    pub due_date: DateTime<Utc>,
    pub assigned_date: DateTime<Utc>,
    pub status: HomeworkStatus,
    pub attachments: Vec<Attachment>,
    pub submissions: Vec<Submission>,
}

impl Homework {
    pub fn submission_of(&self, student_id: u64) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.student_id == student_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewHomework {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub sclass: String,
    pub school_id: u64,
    pub teacher_id: u64,
    pub due_date: DateTime<Utc>,
    pub assigned_date: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub sclass: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<HomeworkStatus>,
    pub attachments: Option<Vec<Attachment>>,
}

/// Status as seen by readers. Overdue is never written back to the store.
pub fn derive_status(
    now: DateTime<Utc>,
    due_date: DateTime<Utc>,
    stored: HomeworkStatus,
) -> HomeworkStatus {
    match stored {
        HomeworkStatus::Active if now > due_date => HomeworkStatus::Overdue,
        other => other,
    }
}

/// Late iff written after the due date.
pub fn classify_submission(now: DateTime<Utc>, due_date: DateTime<Utc>) -> SubmissionStatus {
    if now > due_date {
        SubmissionStatus::Late
    } else {
        SubmissionStatus::Submitted
    }
}

//! Homework assignment, submission and grading.
//!
//! The stored status is only ever Active or Completed as set by the teacher;
//! Overdue is derived on every read from the due date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    model::homework::{
        Attachment, Homework, HomeworkPatch, HomeworkStatus, NewHomework, Submission, classify_submission,
        derive_status,
    },
    service::roster::{find_class, find_student, find_teacher},
    store::{HomeworkFilter, SchoolStore},
};

pub const NOT_SUBMITTED: &str = "Not Submitted";
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkInput {
    #[schema(example = "Chapter 3 exercises")]
    pub title: String,
    #[schema(example = "Solve questions 1 to 10")]
    pub description: String,
    #[schema(example = "Islamiyat")]
    pub subject: String,
    #[schema(example = "4B")]
    pub sclass: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubmissionInput {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeInput {
    pub student_id: u64,
    #[schema(example = 87.5)]
    pub grade: f64,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HomeworkQuery {
    /// Active, Completed, Overdue or all.
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkPage {
    pub homework: Vec<Homework>,
    pub total_pages: u32,
    pub current_page: u32,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentHomework {
    #[serde(flatten)]
    pub homework: Homework,
    pub submission_status: String,
    pub is_submitted: bool,
    pub grade: Option<f64>,
}

fn with_derived_status(mut homework: Homework, now: DateTime<Utc>) -> Homework {
    homework.status = derive_status(now, homework.due_date, homework.status);
    homework
}

/// `None` means no filter ("all" or absent).
fn parse_status_filter(status: Option<&str>) -> Result<Option<HomeworkStatus>, ApiError> {
    match status.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("Unknown homework status: {s}"))),
    }
}

fn ensure_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn ensure_future(due_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ApiError> {
    if due_date <= now {
        return Err(ApiError::validation("Due date must be in the future"));
    }
    Ok(())
}

pub async fn create_homework(
    store: &dyn SchoolStore,
    teacher_id: u64,
    input: HomeworkInput,
    now: DateTime<Utc>,
) -> Result<Homework, ApiError> {
    let teacher = find_teacher(store, teacher_id).await?;

    ensure_text(&input.title, "Title")?;
    ensure_text(&input.description, "Description")?;
    ensure_text(&input.subject, "Subject")?;
    ensure_text(&input.sclass, "Class")?;
    ensure_future(input.due_date, now)?;

    let homework = store
        .insert_homework(NewHomework {
            title: input.title.trim().to_string(),
            description: input.description,
            subject: input.subject.trim().to_string(),
            sclass: input.sclass.trim().to_string(),
            school_id: teacher.school_id,
            teacher_id: teacher.id,
            due_date: input.due_date,
            assigned_date: now,
            attachments: input.attachments,
        })
        .await?;

    tracing::info!(homework_id = homework.id, teacher_id, sclass = %homework.sclass, "Homework created");
    Ok(homework)
}

/// Homework of one class in the caller's school, newest assignment first.
pub async fn homework_by_class(
    store: &dyn SchoolStore,
    school_id: u64,
    class_name: &str,
    query: &HomeworkQuery,
    now: DateTime<Utc>,
) -> Result<HomeworkPage, ApiError> {
    let status = parse_status_filter(query.status.as_deref())?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 || limit == 0 {
        return Err(ApiError::validation("page and limit must be positive"));
    }

    let mut homework: Vec<Homework> = store
        .list_homework(HomeworkFilter::Class {
            school_id,
            sclass: class_name.trim().to_string(),
        })
        .await?
        .into_iter()
        .map(|h| with_derived_status(h, now))
        .filter(|h| status.is_none_or(|s| h.status == s))
        .collect();
    homework.sort_by(|a, b| b.assigned_date.cmp(&a.assigned_date).then(b.id.cmp(&a.id)));

    let total = homework.len();
    let homework = homework
        .into_iter()
        .skip((page as usize - 1).saturating_mul(limit as usize))
        .take(limit as usize)
        .collect();

    Ok(HomeworkPage {
        homework,
        total_pages: total.div_ceil(limit as usize) as u32,
        current_page: page,
        total,
    })
}

/// Homework of the student's class, soonest due first, with the student's own
/// submission state. Other students' submissions are not included.
pub async fn student_homework(
    store: &dyn SchoolStore,
    student_id: u64,
    now: DateTime<Utc>,
) -> Result<Vec<StudentHomework>, ApiError> {
    let student = find_student(store, student_id).await?;
    let sclass = find_class(store, student.sclass_id).await?;

    let mut homework = store
        .list_homework(HomeworkFilter::Class {
            school_id: student.school_id,
            sclass: sclass.sclass_name,
        })
        .await?;
    homework.sort_by_key(|h| (h.due_date, h.id));

    Ok(homework
        .into_iter()
        .map(|h| {
            let mut h = with_derived_status(h, now);
            h.submissions.retain(|s| s.student_id == student.id);
            let own = h.submissions.first();

            StudentHomework {
                submission_status: own.map_or_else(|| NOT_SUBMITTED.to_string(), |s| s.status.to_string()),
                is_submitted: own.is_some(),
                grade: own.and_then(|s| s.grade),
                homework: h,
            }
        })
        .collect())
}

/// Records the student's single submission. The status is fixed now: Late
/// when past the due date.
pub async fn submit_homework(
    store: &dyn SchoolStore,
    student_id: u64,
    homework_id: u64,
    input: SubmissionInput,
    now: DateTime<Utc>,
) -> Result<Submission, ApiError> {
    let student = find_student(store, student_id).await?;
    let homework = store
        .find_homework(homework_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Homework not found"))?;

    let sclass = find_class(store, student.sclass_id).await?;
    if homework.school_id != student.school_id || homework.sclass != sclass.sclass_name {
        return Err(ApiError::forbidden("Homework is not assigned to your class"));
    }
    if homework.submission_of(student.id).is_some() {
        return Err(ApiError::conflict("Homework already submitted"));
    }

    let submission = Submission {
        student_id: student.id,
        submitted_at: now,
        content: input.content,
        attachments: input.attachments,
        grade: None,
        feedback: None,
        status: classify_submission(now, homework.due_date),
    };

    // uq_submissions_student settles a concurrent double submit
    if !store.insert_submission(homework.id, submission.clone()).await? {
        return Err(ApiError::not_found("Homework not found"));
    }

    tracing::info!(homework_id, student_id, status = %submission.status, "Homework submitted");
    Ok(submission)
}

pub async fn homework_by_teacher(
    store: &dyn SchoolStore,
    teacher_id: u64,
    query: &HomeworkQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Homework>, ApiError> {
    let status = parse_status_filter(query.status.as_deref())?;
    let class_name = query.class_name.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let mut homework: Vec<Homework> = store
        .list_homework(HomeworkFilter::Teacher(teacher_id))
        .await?
        .into_iter()
        .filter(|h| class_name.is_none_or(|c| h.sclass == c))
        .map(|h| with_derived_status(h, now))
        .filter(|h| status.is_none_or(|s| h.status == s))
        .collect();
    homework.sort_by(|a, b| b.assigned_date.cmp(&a.assigned_date).then(b.id.cmp(&a.id)));
    Ok(homework)
}

/// Unknown homework and homework of another teacher look the same to the caller.
async fn owned_homework(store: &dyn SchoolStore, teacher_id: u64, homework_id: u64) -> Result<Homework, ApiError> {
    store
        .find_homework(homework_id)
        .await?
        .filter(|h| h.teacher_id == teacher_id)
        .ok_or_else(|| ApiError::not_found("Homework not found or unauthorized"))
}

pub async fn update_homework(
    store: &dyn SchoolStore,
    teacher_id: u64,
    homework_id: u64,
    patch: HomeworkPatch,
    now: DateTime<Utc>,
) -> Result<Homework, ApiError> {
    let homework = owned_homework(store, teacher_id, homework_id).await?;

    if let Some(due_date) = patch.due_date {
        ensure_future(due_date, now)?;
    }
    if patch.status == Some(HomeworkStatus::Overdue) {
        return Err(ApiError::validation("Overdue is derived from the due date and cannot be set"));
    }
    for (value, field) in [
        (&patch.title, "Title"),
        (&patch.description, "Description"),
        (&patch.subject, "Subject"),
        (&patch.sclass, "Class"),
    ] {
        if let Some(v) = value {
            ensure_text(v, field)?;
        }
    }

    let updated = store
        .update_homework(homework.id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Homework not found or unauthorized"))?;
    Ok(with_derived_status(updated, now))
}

pub async fn delete_homework(store: &dyn SchoolStore, teacher_id: u64, homework_id: u64) -> Result<(), ApiError> {
    let homework = owned_homework(store, teacher_id, homework_id).await?;
    if !store.delete_homework(homework.id).await? {
        return Err(ApiError::not_found("Homework not found or unauthorized"));
    }
    tracing::info!(homework_id, teacher_id, "Homework deleted");
    Ok(())
}

pub async fn grade_submission(
    store: &dyn SchoolStore,
    teacher_id: u64,
    homework_id: u64,
    input: GradeInput,
) -> Result<Homework, ApiError> {
    if !(0.0..=100.0).contains(&input.grade) {
        return Err(ApiError::validation("Grade must be between 0 and 100"));
    }
    let homework = owned_homework(store, teacher_id, homework_id).await?;

    if !store
        .grade_submission(homework.id, input.student_id, input.grade, input.feedback)
        .await?
    {
        return Err(ApiError::not_found("Submission not found"));
    }

    store
        .find_homework(homework.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Homework not found or unauthorized"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::homework::SubmissionStatus;
    use crate::service::roster::{
        create_class, create_student, create_teacher,
        tests::{registration, school, teacher_registration},
    };
    use crate::store::MemoryStore;
    use chrono::Duration;

    struct Setup {
        store: MemoryStore,
        teacher: u64,
        other_teacher: u64,
        student: u64,
        classmate: u64,
        outsider: u64,
        school_id: u64,
    }

    async fn setup() -> Setup {
        let store = MemoryStore::new();
        let admin = school(&store, "Green Valley").await;
        create_class(&store, admin.id, "4B").await.unwrap();
        create_class(&store, admin.id, "5A").await.unwrap();
        let teacher = create_teacher(&store, teacher_registration(admin.id, "t@x.com")).await.unwrap();
        let other = create_teacher(&store, teacher_registration(admin.id, "o@x.com")).await.unwrap();
        let student = create_student(&store, registration(admin.id, "4B", 1, "s1@x.com")).await.unwrap();
        let classmate = create_student(&store, registration(admin.id, "4B", 2, "s2@x.com")).await.unwrap();
        let outsider = create_student(&store, registration(admin.id, "5A", 1, "s3@x.com")).await.unwrap();

        Setup {
            store,
            teacher: teacher.id,
            other_teacher: other.id,
            student: student.id,
            classmate: classmate.id,
            outsider: outsider.id,
            school_id: admin.school_id,
        }
    }

    fn input(title: &str, sclass: &str, due_date: DateTime<Utc>) -> HomeworkInput {
        HomeworkInput {
            title: title.into(),
            description: "Questions 1 to 10".into(),
            subject: "Islamiyat".into(),
            sclass: sclass.into(),
            due_date,
            attachments: vec![],
        }
    }

    #[actix_web::test]
    async fn due_date_must_be_strictly_in_the_future() {
        let s = setup().await;
        let now = Utc::now();

        let err = create_homework(&s.store, s.teacher, input("HW", "4B", now), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Due date must be in the future"));

        let hw = create_homework(&s.store, s.teacher, input("HW", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();
        assert_eq!(hw.status, HomeworkStatus::Active);
        assert_eq!(hw.school_id, s.school_id);
    }

    #[actix_web::test]
    async fn unknown_teacher_cannot_create_homework() {
        let s = setup().await;
        let now = Utc::now();
        let err = create_homework(&s.store, 9_999, input("HW", "4B", now + Duration::days(1)), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[actix_web::test]
    async fn overdue_is_derived_at_read_time_and_never_stored() {
        let s = setup().await;
        let now = Utc::now();
        let hw = create_homework(&s.store, s.teacher, input("HW", "4B", now + Duration::hours(1)), now)
            .await
            .unwrap();

        let later = now + Duration::hours(2);
        let page = homework_by_class(&s.store, s.school_id, "4B", &HomeworkQuery::default(), later)
            .await
            .unwrap();
        assert_eq!(page.homework[0].status, HomeworkStatus::Overdue);

        let stored = s.store.find_homework(hw.id).await.unwrap().unwrap();
        assert_eq!(stored.status, HomeworkStatus::Active);

        let overdue = HomeworkQuery {
            status: Some("Overdue".into()),
            ..Default::default()
        };
        assert_eq!(homework_by_class(&s.store, s.school_id, "4B", &overdue, later).await.unwrap().total, 1);
        assert_eq!(homework_by_class(&s.store, s.school_id, "4B", &overdue, now).await.unwrap().total, 0);
    }

    #[actix_web::test]
    async fn class_listing_is_paginated_newest_first() {
        let s = setup().await;
        let now = Utc::now();
        for i in 0..3 {
            let assigned = now + Duration::minutes(i);
            create_homework(&s.store, s.teacher, input(&format!("HW{i}"), "4B", now + Duration::days(1)), assigned)
                .await
                .unwrap();
        }

        let query = HomeworkQuery {
            page: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let page = homework_by_class(&s.store, s.school_id, "4B", &query, now).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.current_page, 1);
        let titles: Vec<&str> = page.homework.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["HW2", "HW1"]);

        let bad = HomeworkQuery {
            status: Some("Pending".into()),
            ..Default::default()
        };
        assert!(matches!(
            homework_by_class(&s.store, s.school_id, "4B", &bad, now).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn page_far_past_the_end_is_empty() {
        let s = setup().await;
        let now = Utc::now();
        create_homework(&s.store, s.teacher, input("HW", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();

        let query = HomeworkQuery {
            page: Some(70_000),
            limit: Some(70_000),
            ..Default::default()
        };
        let page = homework_by_class(&s.store, s.school_id, "4B", &query, now).await.unwrap();
        assert!(page.homework.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current_page, 70_000);
    }

    #[actix_web::test]
    async fn second_submission_conflicts_and_late_is_fixed_at_write() {
        let s = setup().await;
        let now = Utc::now();
        let due = now + Duration::hours(1);
        let hw = create_homework(&s.store, s.teacher, input("HW", "4B", due), now).await.unwrap();

        let on_time = submit_homework(&s.store, s.student, hw.id, SubmissionInput::default(), due)
            .await
            .unwrap();
        assert_eq!(on_time.status, SubmissionStatus::Submitted);

        let err = submit_homework(&s.store, s.student, hw.id, SubmissionInput::default(), due)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Homework already submitted"));

        let late = submit_homework(
            &s.store,
            s.classmate,
            hw.id,
            SubmissionInput::default(),
            due + Duration::seconds(1),
        )
        .await
        .unwrap();
        assert_eq!(late.status, SubmissionStatus::Late);

        let err = submit_homework(&s.store, s.outsider, hw.id, SubmissionInput::default(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = submit_homework(&s.store, s.student, 9_999, SubmissionInput::default(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[actix_web::test]
    async fn student_list_shows_only_their_own_submission_state() {
        let s = setup().await;
        let now = Utc::now();
        let later = create_homework(&s.store, s.teacher, input("Later", "4B", now + Duration::days(3)), now)
            .await
            .unwrap();
        create_homework(&s.store, s.teacher, input("Sooner", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();
        create_homework(&s.store, s.teacher, input("Other class", "5A", now + Duration::days(1)), now)
            .await
            .unwrap();

        submit_homework(&s.store, s.classmate, later.id, SubmissionInput::default(), now)
            .await
            .unwrap();

        let list = student_homework(&s.store, s.student, now).await.unwrap();
        let titles: Vec<&str> = list.iter().map(|h| h.homework.title.as_str()).collect();
        assert_eq!(titles, vec!["Sooner", "Later"]);
        assert!(list.iter().all(|h| !h.is_submitted && h.submission_status == NOT_SUBMITTED));
        assert!(list.iter().all(|h| h.homework.submissions.is_empty() && h.grade.is_none()));
    }

    #[actix_web::test]
    async fn only_the_owner_may_change_homework() {
        let s = setup().await;
        let now = Utc::now();
        let hw = create_homework(&s.store, s.teacher, input("HW", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();

        let patch = HomeworkPatch {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        let err = update_homework(&s.store, s.other_teacher, hw.id, patch.clone(), now)
            .await
            .unwrap_err();
        let missing = update_homework(&s.store, s.teacher, 9_999, patch.clone(), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Homework not found or unauthorized");
        assert_eq!(err.to_string(), missing.to_string());

        let updated = update_homework(&s.store, s.teacher, hw.id, patch, now).await.unwrap();
        assert_eq!(updated.title, "Renamed");

        let past = HomeworkPatch {
            due_date: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(matches!(
            update_homework(&s.store, s.teacher, hw.id, past, now).await,
            Err(ApiError::Validation(_))
        ));

        assert!(matches!(
            delete_homework(&s.store, s.other_teacher, hw.id).await,
            Err(ApiError::NotFound(_))
        ));
        delete_homework(&s.store, s.teacher, hw.id).await.unwrap();
        assert!(s.store.find_homework(hw.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn grading_marks_the_submission_graded() {
        let s = setup().await;
        let now = Utc::now();
        let hw = create_homework(&s.store, s.teacher, input("HW", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();
        submit_homework(&s.store, s.student, hw.id, SubmissionInput::default(), now)
            .await
            .unwrap();

        let out_of_range = GradeInput {
            student_id: s.student,
            grade: 120.0,
            feedback: None,
        };
        assert!(matches!(
            grade_submission(&s.store, s.teacher, hw.id, out_of_range).await,
            Err(ApiError::Validation(_))
        ));

        let graded = grade_submission(
            &s.store,
            s.teacher,
            hw.id,
            GradeInput {
                student_id: s.student,
                grade: 88.0,
                feedback: Some("Well done".into()),
            },
        )
        .await
        .unwrap();
        let submission = graded.submission_of(s.student).unwrap();
        assert_eq!(submission.status, SubmissionStatus::Graded);
        assert_eq!(submission.grade, Some(88.0));

        let list = student_homework(&s.store, s.student, now).await.unwrap();
        assert_eq!(list[0].submission_status, "Graded");
        assert_eq!(list[0].grade, Some(88.0));

        let nobody = GradeInput {
            student_id: s.classmate,
            grade: 50.0,
            feedback: None,
        };
        assert!(matches!(
            grade_submission(&s.store, s.teacher, hw.id, nobody).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn teacher_listing_filters_by_class() {
        let s = setup().await;
        let now = Utc::now();
        create_homework(&s.store, s.teacher, input("A", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();
        create_homework(&s.store, s.teacher, input("B", "5A", now + Duration::days(1)), now)
            .await
            .unwrap();
        create_homework(&s.store, s.other_teacher, input("C", "4B", now + Duration::days(1)), now)
            .await
            .unwrap();

        let all = homework_by_teacher(&s.store, s.teacher, &HomeworkQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let query = HomeworkQuery {
            class_name: Some("5A".into()),
            status: Some("all".into()),
            ..Default::default()
        };
        let only = homework_by_teacher(&s.store, s.teacher, &query, now).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].title, "B");
    }
}

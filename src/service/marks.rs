use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    model::marks::{AssessmentType, Marks, MarksPatch, NewMarks},
    service::roster::{find_student, find_subject, find_teacher},
    store::{MarksFilter, SchoolStore},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarksInput {
    pub student_id: u64,
    pub subject_id: u64,
    /// Filled from the session for teachers; admins must supply it.
    pub teacher_id: Option<u64>,
    #[serde(default)]
    pub assessment_type: AssessmentType,
    #[serde(default)]
    pub topic: String,
    pub date: Option<DateTime<Utc>>,
    #[schema(example = 42)]
    pub obtained_marks: f64,
    #[schema(example = 50)]
    pub total_marks: f64,
}

/// A marks record with the names a report card needs.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarksView {
    #[serde(flatten)]
    pub marks: Marks,
    pub student_name: Option<String>,
    pub roll_num: Option<i32>,
    pub class_name: Option<String>,
    pub subject_name: Option<String>,
    pub teacher_name: Option<String>,
}

fn ensure_non_negative(obtained: Option<f64>, total: Option<f64>) -> Result<(), ApiError> {
    if obtained.is_some_and(|m| m < 0.0) || total.is_some_and(|m| m < 0.0) {
        return Err(ApiError::validation("Marks cannot be negative"));
    }
    Ok(())
}

async fn view(store: &dyn SchoolStore, marks: Marks) -> Result<MarksView, ApiError> {
    let student = store.find_student(marks.student_id).await?;
    let class_name = match &student {
        Some(s) => store.find_class(s.sclass_id).await?.map(|c| c.sclass_name),
        None => None,
    };
    let subject_name = store.find_subject(marks.subject_id).await?.map(|s| s.sub_name);
    let teacher_name = store.find_teacher(marks.teacher_id).await?.map(|t| t.name);

    Ok(MarksView {
        student_name: student.as_ref().map(|s| s.name.clone()),
        roll_num: student.as_ref().map(|s| s.roll_num),
        class_name,
        subject_name,
        teacher_name,
        marks,
    })
}

pub async fn add_marks(store: &dyn SchoolStore, input: MarksInput, now: DateTime<Utc>) -> Result<Marks, ApiError> {
    let teacher_id = input
        .teacher_id
        .ok_or_else(|| ApiError::validation("Teacher ID is required"))?;
    ensure_non_negative(Some(input.obtained_marks), Some(input.total_marks))?;

    let student = find_student(store, input.student_id).await?;
    let subject = find_subject(store, input.subject_id).await?;
    let teacher = find_teacher(store, teacher_id).await?;

    let marks = store
        .insert_marks(NewMarks {
            student_id: student.id,
            teacher_id: teacher.id,
            subject_id: subject.id,
            assessment_type: input.assessment_type,
            topic: input.topic,
            date: input.date.unwrap_or(now),
            obtained_marks: input.obtained_marks,
            total_marks: input.total_marks,
        })
        .await?;

    tracing::info!(marks_id = marks.id, student_id = student.id, subject_id = subject.id, "Marks added");
    Ok(marks)
}

/// Records matching the filter, newest first.
pub async fn list_marks(store: &dyn SchoolStore, filter: MarksFilter) -> Result<Vec<MarksView>, ApiError> {
    let mut records = store.list_marks(filter).await?;
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

    let mut views = Vec::with_capacity(records.len());
    for marks in records {
        views.push(view(store, marks).await?);
    }
    Ok(views)
}

pub async fn find_marks(store: &dyn SchoolStore, marks_id: u64) -> Result<Marks, ApiError> {
    store
        .find_marks(marks_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Marks record not found"))
}

pub async fn update_marks(store: &dyn SchoolStore, marks_id: u64, patch: MarksPatch) -> Result<MarksView, ApiError> {
    ensure_non_negative(patch.obtained_marks, patch.total_marks)?;

    let updated = store
        .update_marks(marks_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Marks record not found"))?;
    view(store, updated).await
}

pub async fn delete_marks(store: &dyn SchoolStore, marks_id: u64) -> Result<(), ApiError> {
    if !store.delete_marks(marks_id).await? {
        return Err(ApiError::not_found("Marks record not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::roster::{
        SubjectInput, create_class, create_student, create_subjects, create_teacher,
        tests::{registration, school, teacher_registration},
    };
    use crate::store::MemoryStore;
    use chrono::Duration;

    async fn setup() -> (MemoryStore, u64, u64, u64) {
        let store = MemoryStore::new();
        let admin = school(&store, "Green Valley").await;
        let sclass = create_class(&store, admin.id, "4B").await.unwrap();
        let subject = create_subjects(
            &store,
            admin.id,
            sclass.id,
            vec![SubjectInput {
                sub_name: "Math".into(),
                sub_code: None,
                sessions: None,
            }],
        )
        .await
        .unwrap()
        .remove(0);
        let teacher = create_teacher(&store, teacher_registration(admin.id, "t@x.com")).await.unwrap();
        let student = create_student(&store, registration(admin.id, "4B", 3, "s@x.com")).await.unwrap();
        (store, student.id, subject.id, teacher.id)
    }

    fn input(student_id: u64, subject_id: u64, teacher_id: Option<u64>, obtained: f64) -> MarksInput {
        MarksInput {
            student_id,
            subject_id,
            teacher_id,
            assessment_type: AssessmentType::Quiz,
            topic: "Fractions".into(),
            date: None,
            obtained_marks: obtained,
            total_marks: 20.0,
        }
    }

    #[actix_web::test]
    async fn listing_by_student_is_denormalized() {
        let (store, student, subject, teacher) = setup().await;
        let now = Utc::now();
        add_marks(&store, input(student, subject, Some(teacher), 15.0), now - Duration::days(1))
            .await
            .unwrap();
        add_marks(&store, input(student, subject, Some(teacher), 18.0), now).await.unwrap();

        let views = list_marks(&store, MarksFilter::Student(student)).await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].marks.obtained_marks, 18.0);
        assert_eq!(views[0].student_name.as_deref(), Some("Areeba Ali"));
        assert_eq!(views[0].roll_num, Some(3));
        assert_eq!(views[0].class_name.as_deref(), Some("4B"));
        assert_eq!(views[0].subject_name.as_deref(), Some("Math"));
        assert_eq!(views[0].teacher_name.as_deref(), Some("Sara Khan"));

        let json = serde_json::to_value(&views[0]).unwrap();
        assert_eq!(json["assessmentType"], "Quiz");
        assert_eq!(json["subjectName"], "Math");
    }

    #[actix_web::test]
    async fn missing_references_are_named() {
        let (store, student, subject, teacher) = setup().await;
        let now = Utc::now();

        let err = add_marks(&store, input(9_999, subject, Some(teacher), 1.0), now).await.unwrap_err();
        assert_eq!(err.to_string(), "Student not found");
        let err = add_marks(&store, input(student, 9_999, Some(teacher), 1.0), now).await.unwrap_err();
        assert_eq!(err.to_string(), "Subject not found");
        let err = add_marks(&store, input(student, subject, Some(9_999), 1.0), now).await.unwrap_err();
        assert_eq!(err.to_string(), "Teacher not found");
        let err = add_marks(&store, input(student, subject, None, 1.0), now).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Teacher ID is required"));
    }

    #[actix_web::test]
    async fn negative_marks_are_rejected() {
        let (store, student, subject, teacher) = setup().await;
        let err = add_marks(&store, input(student, subject, Some(teacher), -1.0), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(list_marks(&store, MarksFilter::Subject(subject)).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn update_and_delete_by_id() {
        let (store, student, subject, teacher) = setup().await;
        let marks = add_marks(&store, input(student, subject, Some(teacher), 10.0), Utc::now())
            .await
            .unwrap();

        let updated = update_marks(
            &store,
            marks.id,
            MarksPatch {
                obtained_marks: Some(12.5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.marks.obtained_marks, 12.5);
        assert_eq!(updated.marks.topic, "Fractions");

        delete_marks(&store, marks.id).await.unwrap();
        assert!(matches!(delete_marks(&store, marks.id).await, Err(ApiError::NotFound(_))));
        assert!(matches!(
            update_marks(&store, marks.id, MarksPatch::default()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(list_marks(&store, MarksFilter::Teacher(teacher)).await.unwrap().is_empty());
    }
}

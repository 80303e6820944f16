use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    model::attendance::{AttendanceMark, AttendanceStatus},
    service::roster::{find_class, find_student, find_teacher},
    store::{SchoolStore, Scope},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    #[schema(example = 3)]
    pub sclass_id: u64,
    #[schema(value_type = String, format = "date", example = "2024-09-02")]
    pub date: NaiveDate,
    #[serde(default)]
    pub records: Vec<AttendanceMark>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceRow {
    pub id: u64,
    pub student_id: u64,
    pub student_name: Option<String>,
    pub roll_num: Option<i32>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: u64,
    pub marked_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentAttendanceDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Writes one day of attendance for a class. Only the homeroom teacher may do
/// so, every record must name a student of the class, and the batch is applied
/// all-or-nothing.
pub async fn mark_class_attendance(
    store: &dyn SchoolStore,
    teacher_id: u64,
    request: MarkAttendanceRequest,
) -> Result<usize, ApiError> {
    if request.records.is_empty() {
        return Err(ApiError::validation("Attendance records are required"));
    }

    // 1️⃣ homeroom check
    let teacher = find_teacher(store, teacher_id).await?;
    if teacher.class_teacher_of != Some(request.sclass_id) {
        return Err(ApiError::forbidden("Only the class teacher can mark attendance for this class."));
    }

    // 2️⃣ membership check, before anything is written
    let members: HashSet<u64> = store
        .list_students(Scope::Class(request.sclass_id))
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if let Some(stranger) = request.records.iter().find(|r| !members.contains(&r.student_id)) {
        return Err(ApiError::validation(format!(
            "Student {} does not belong to this class",
            stranger.student_id
        )));
    }

    // 3️⃣ one bulk upsert keyed by (student, class, date)
    store
        .upsert_attendance(request.sclass_id, request.date, teacher.id, &request.records)
        .await?;

    tracing::info!(
        sclass_id = request.sclass_id,
        date = %request.date,
        records = request.records.len(),
        teacher_id,
        "Attendance saved"
    );
    Ok(request.records.len())
}

pub async fn class_attendance(
    store: &dyn SchoolStore,
    sclass_id: u64,
    date: Option<NaiveDate>,
) -> Result<Vec<ClassAttendanceRow>, ApiError> {
    let sclass = find_class(store, sclass_id).await?;
    let records = store.list_class_attendance(sclass.id, date).await?;

    let students: HashMap<u64, (String, i32)> = store
        .list_students(Scope::Class(sclass.id))
        .await?
        .into_iter()
        .map(|s| (s.id, (s.name, s.roll_num)))
        .collect();

    let mut markers: HashMap<u64, Option<String>> = HashMap::new();
    for record in &records {
        if !markers.contains_key(&record.marked_by) {
            let name = store.find_teacher(record.marked_by).await?.map(|t| t.name);
            markers.insert(record.marked_by, name);
        }
    }

    Ok(records
        .into_iter()
        .map(|r| {
            let student = students.get(&r.student_id);
            ClassAttendanceRow {
                id: r.id,
                student_id: r.student_id,
                student_name: student.map(|(name, _)| name.clone()),
                roll_num: student.map(|(_, roll)| *roll),
                date: r.date,
                status: r.status,
                marked_by: r.marked_by,
                marked_by_name: markers.get(&r.marked_by).cloned().flatten(),
            }
        })
        .collect())
}

/// Attendance history of one student, oldest first.
pub async fn student_attendance(
    store: &dyn SchoolStore,
    student_id: u64,
) -> Result<Vec<StudentAttendanceDay>, ApiError> {
    let student = find_student(store, student_id).await?;
    Ok(store
        .list_student_attendance(student.id)
        .await?
        .into_iter()
        .map(|a| StudentAttendanceDay {
            date: a.date,
            status: a.status,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::roster::{
        assign_class_teacher, create_class, create_student, create_teacher,
        tests::{registration, school, teacher_registration},
    };
    use crate::store::MemoryStore;

    struct Setup {
        store: MemoryStore,
        sclass_id: u64,
        homeroom: u64,
        other_teacher: u64,
        students: Vec<u64>,
        outsider: u64,
    }

    async fn setup() -> Setup {
        let store = MemoryStore::new();
        let admin = school(&store, "Green Valley").await;
        let sclass = create_class(&store, admin.id, "4B").await.unwrap();
        create_class(&store, admin.id, "5A").await.unwrap();

        let homeroom = create_teacher(&store, teacher_registration(admin.id, "home@x.com")).await.unwrap();
        let other = create_teacher(&store, teacher_registration(admin.id, "other@x.com")).await.unwrap();
        assign_class_teacher(&store, homeroom.id, sclass.id).await.unwrap();

        let mut students = Vec::new();
        for roll in 1..=2 {
            let s = create_student(&store, registration(admin.id, "4B", roll, &format!("s{roll}@x.com")))
                .await
                .unwrap();
            students.push(s.id);
        }
        let outsider = create_student(&store, registration(admin.id, "5A", 1, "o@x.com")).await.unwrap();

        Setup {
            store,
            sclass_id: sclass.id,
            homeroom: homeroom.id,
            other_teacher: other.id,
            students,
            outsider: outsider.id,
        }
    }

    fn request(sclass_id: u64, date: NaiveDate, records: &[(u64, AttendanceStatus)]) -> MarkAttendanceRequest {
        MarkAttendanceRequest {
            sclass_id,
            date,
            records: records
                .iter()
                .map(|&(student_id, status)| AttendanceMark { student_id, status })
                .collect(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    #[actix_web::test]
    async fn remarking_a_day_overwrites_instead_of_duplicating() {
        let s = setup().await;
        let first = s.students[0];

        mark_class_attendance(&s.store, s.homeroom, request(s.sclass_id, day(2), &[(first, AttendanceStatus::Present)]))
            .await
            .unwrap();
        mark_class_attendance(&s.store, s.homeroom, request(s.sclass_id, day(2), &[(first, AttendanceStatus::Absent)]))
            .await
            .unwrap();

        let rows = class_attendance(&s.store, s.sclass_id, Some(day(2))).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
        assert_eq!(rows[0].student_name.as_deref(), Some("Areeba Ali"));
        assert_eq!(rows[0].marked_by_name.as_deref(), Some("Sara Khan"));
    }

    #[actix_web::test]
    async fn non_homeroom_teacher_is_forbidden_and_nothing_is_written() {
        let s = setup().await;

        let err = mark_class_attendance(
            &s.store,
            s.other_teacher,
            request(s.sclass_id, day(2), &[(s.students[0], AttendanceStatus::Present)]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(class_attendance(&s.store, s.sclass_id, None).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn one_foreign_student_rejects_the_whole_batch() {
        let s = setup().await;

        let err = mark_class_attendance(
            &s.store,
            s.homeroom,
            request(
                s.sclass_id,
                day(2),
                &[
                    (s.students[0], AttendanceStatus::Present),
                    (s.outsider, AttendanceStatus::Present),
                ],
            ),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), format!("Student {} does not belong to this class", s.outsider));
        assert!(class_attendance(&s.store, s.sclass_id, None).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn empty_batch_is_a_validation_error() {
        let s = setup().await;
        let err = mark_class_attendance(&s.store, s.homeroom, request(s.sclass_id, day(2), &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[actix_web::test]
    async fn student_history_is_oldest_first() {
        let s = setup().await;
        let first = s.students[0];

        for (d, status) in [(5, AttendanceStatus::Leave), (2, AttendanceStatus::Present), (3, AttendanceStatus::Absent)] {
            mark_class_attendance(&s.store, s.homeroom, request(s.sclass_id, day(d), &[(first, status)]))
                .await
                .unwrap();
        }

        let history = student_attendance(&s.store, first).await.unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|h| h.date).collect();
        assert_eq!(dates, vec![day(2), day(3), day(5)]);
        assert_eq!(history[2].status, AttendanceStatus::Leave);

        assert!(matches!(
            student_attendance(&s.store, 9_999).await,
            Err(ApiError::NotFound(_))
        ));
    }
}

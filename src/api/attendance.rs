use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    api::{Store, require_school, require_student_access},
    auth::auth::AuthUser,
    error::ApiError,
    model::role::Role,
    service::{
        attendance::{self, ClassAttendanceRow, MarkAttendanceRequest, StudentAttendanceDay},
        roster,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceDateFilter {
    /// Only this calendar day (YYYY-MM-DD)
    #[param(value_type = Option<String>, format = "date", example = "2024-09-02")]
    pub date: Option<NaiveDate>,
}

/// Mark one day of attendance for a class
#[utoipa::path(
    post,
    path = "/api/Attendance/Mark",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = Object, example = json!({
            "message": "Attendance saved successfully"
        })),
        (status = 400, description = "Empty batch or a student outside the class", body = Object, example = json!({
            "kind": "ValidationError",
            "message": "Student 42 does not belong to this class"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the class teacher can mark attendance for this class."),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    store: Store,
    payload: web::Json<MarkAttendanceRequest>,
) -> Result<impl Responder, ApiError> {
    auth.require_teacher()?;
    let saved = attendance::mark_class_attendance(store.get_ref(), auth.principal_id, payload.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance saved successfully",
        "records": saved
    })))
}

/// Attendance of a class, optionally for one day
#[utoipa::path(
    get,
    path = "/api/Attendance/{sclassId}",
    params(
        ("sclassId" = u64, Path, description = "Class id"),
        AttendanceDateFilter
    ),
    responses(
        (status = 200, description = "Attendance rows with student and marker names", body = [ClassAttendanceRow]),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn class_attendance(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    filter: web::Query<AttendanceDateFilter>,
) -> Result<impl Responder, ApiError> {
    auth.require_role(&[Role::Admin, Role::Teacher])?;
    let sclass = roster::find_class(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, sclass.school_id).await?;

    let rows = attendance::class_attendance(store.get_ref(), sclass.id, filter.date).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Attendance history of one student, oldest first
#[utoipa::path(
    get,
    path = "/api/Attendance/Student/{studentId}",
    params(("studentId" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Days with status", body = [StudentAttendanceDay]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn student_attendance(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let student_id = path.into_inner();
    require_student_access(store.get_ref(), &auth, student_id).await?;
    Ok(HttpResponse::Ok().json(attendance::student_attendance(store.get_ref(), student_id).await?))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde_json::json;

    use crate::api::test_support::{bearer, send, test_app};

    #[actix_web::test]
    async fn only_the_homeroom_teacher_marks_attendance() {
        let app = test_app!();

        let (_, reg) = send!(
            app,
            TestRequest::post().uri("/AdminReg").set_json(json!({
                "name": "Head",
                "email": "head@gv.edu",
                "password": "admin123",
                "schoolName": "Green Valley"
            }))
        );
        let admin = reg["token"].as_str().unwrap().to_string();
        let admin_id = reg["user"]["id"].as_u64().unwrap();

        let (_, class) = send!(
            app,
            TestRequest::post()
                .uri("/api/SclassCreate")
                .insert_header(bearer(&admin))
                .set_json(json!({ "sclassName": "4B", "adminID": admin_id }))
        );
        let class_id = class["id"].as_u64().unwrap();

        let mut teacher_ids = Vec::new();
        for email in ["home@gv.edu", "other@gv.edu"] {
            let (status, teacher) = send!(
                app,
                TestRequest::post()
                    .uri("/api/TeacherReg")
                    .insert_header(bearer(&admin))
                    .set_json(json!({
                        "name": "Sara Khan",
                        "email": email,
                        "password": "teach123",
                        "adminID": admin_id
                    }))
            );
            assert_eq!(status, 201);
            teacher_ids.push(teacher["id"].as_u64().unwrap());
        }

        let (status, _) = send!(
            app,
            TestRequest::post()
                .uri("/api/assign-class-teacher")
                .insert_header(bearer(&admin))
                .set_json(json!({ "teacherId": teacher_ids[0], "classId": class_id }))
        );
        assert_eq!(status, 200);

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/assign-class-teacher")
                .insert_header(bearer(&admin))
                .set_json(json!({ "teacherId": teacher_ids[1], "classId": class_id }))
        );
        assert_eq!(status, 409);
        assert_eq!(body["message"], "A class teacher is already assigned to this class.");

        let (_, student) = send!(
            app,
            TestRequest::post()
                .uri("/api/StudentReg")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "name": "Areeba Ali",
                    "fatherName": "Junaid Ali",
                    "email": "s@gv.edu",
                    "password": "secret123",
                    "rollNum": 1,
                    "dob": "2011-05-12",
                    "phoneNumber": "1",
                    "emergencyContact": "2",
                    "address": "Street 7",
                    "sclassName": "4B",
                    "adminID": admin_id
                }))
        );
        let student_id = student["id"].as_u64().unwrap();

        let mut tokens = Vec::new();
        for email in ["home@gv.edu", "other@gv.edu"] {
            let (_, login) = send!(
                app,
                TestRequest::post()
                    .uri("/Login")
                    .set_json(json!({ "email": email, "password": "teach123" }))
            );
            tokens.push(login["token"].as_str().unwrap().to_string());
        }

        let batch = json!({
            "sclassId": class_id,
            "date": "2024-09-02",
            "records": [{ "studentId": student_id, "status": "Present" }]
        });

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/Attendance/Mark")
                .insert_header(bearer(&tokens[1]))
                .set_json(batch.clone())
        );
        assert_eq!(status, 403);
        assert_eq!(body["message"], "Only the class teacher can mark attendance for this class.");

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/Attendance/Mark")
                .insert_header(bearer(&tokens[0]))
                .set_json(batch)
        );
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Attendance saved successfully");

        let (status, rows) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/Attendance/{class_id}?date=2024-09-02"))
                .insert_header(bearer(&admin))
        );
        assert_eq!(status, 200);
        assert_eq!(rows[0]["studentName"], "Areeba Ali");
        assert_eq!(rows[0]["status"], "Present");

        let (status, history) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/Attendance/Student/{student_id}"))
                .insert_header(bearer(&tokens[0]))
        );
        assert_eq!(status, 200);
        assert_eq!(history, json!([{ "date": "2024-09-02", "status": "Present" }]));
    }
}

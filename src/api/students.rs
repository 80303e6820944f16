use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    api::{Store, message, require_own_admin, require_school, require_student_access},
    auth::auth::AuthUser,
    error::ApiError,
    model::role::Role,
    service::roster::{self, StudentPatch, StudentRegistration, StudentView},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultInput {
    /// Subject id.
    #[serde(alias = "subName")]
    #[schema(example = 5)]
    pub subject_id: u64,
    #[schema(example = 78)]
    pub marks_obtained: f64,
}

/// Register a student into a class of the admin's school
#[utoipa::path(
    post,
    path = "/api/StudentReg",
    request_body = StudentRegistration,
    responses(
        (status = 201, description = "Student registered", body = StudentView),
        (status = 400, description = "Missing required fields or weak password"),
        (status = 404, description = "Class not found. Please check class name."),
        (status = 409, description = "Roll number or email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn register_student(
    auth: AuthUser,
    store: Store,
    payload: web::Json<StudentRegistration>,
) -> Result<impl Responder, ApiError> {
    let payload = payload.into_inner();
    let admin_id = payload
        .admin_id
        .ok_or_else(|| ApiError::validation("Missing required fields: adminID"))?;
    require_own_admin(&auth, admin_id)?;

    let student = roster::create_student(store.get_ref(), payload).await?;
    Ok(HttpResponse::Created().json(student))
}

/// Students of the admin's school
#[utoipa::path(
    get,
    path = "/api/Students/{id}",
    params(("id" = u64, Path, description = "Admin id")),
    responses((status = 200, description = "Students of the school", body = [StudentView])),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_students(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let admin_id = path.into_inner();
    require_own_admin(&auth, admin_id)?;

    let students = roster::list_students(store.get_ref(), admin_id).await?;
    if students.is_empty() {
        return Err(ApiError::not_found("No students found"));
    }
    Ok(HttpResponse::Ok().json(students))
}

/// Student profile with class, school and exam subject names
#[utoipa::path(
    get,
    path = "/api/Student/{id}",
    params(("id" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student found", body = StudentView),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No student found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn student_detail(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let student_id = path.into_inner();
    require_student_access(store.get_ref(), &auth, student_id).await?;
    Ok(HttpResponse::Ok().json(roster::student_detail(store.get_ref(), student_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/Student/{id}",
    params(("id" = u64, Path, description = "Student id")),
    request_body = StudentPatch,
    responses(
        (status = 200, description = "Student updated", body = StudentView),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Roll number or email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn update_student(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<StudentPatch>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let student = roster::find_student(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, student.school_id).await?;

    let view = roster::update_student(store.get_ref(), student.id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Student updated successfully", "student": view })))
}

#[utoipa::path(
    delete,
    path = "/api/Student/{id}",
    params(("id" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student deleted"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn delete_student(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let student = roster::find_student(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, student.school_id).await?;

    roster::delete_student(store.get_ref(), student.id).await?;
    Ok(message("Student deleted successfully"))
}

/// Set the exam result of one subject, replacing an earlier one
#[utoipa::path(
    put,
    path = "/api/UpdateExamResult/{id}",
    params(("id" = u64, Path, description = "Student id")),
    request_body = ExamResultInput,
    responses(
        (status = 200, description = "Exam result updated", body = StudentView),
        (status = 400, description = "Marks cannot be negative"),
        (status = 404, description = "Student or subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn update_exam_result(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<ExamResultInput>,
) -> Result<impl Responder, ApiError> {
    auth.require_role(&[Role::Admin, Role::Teacher])?;
    let student = roster::find_student(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, student.school_id).await?;

    let view =
        roster::update_exam_result(store.get_ref(), student.id, payload.subject_id, payload.marks_obtained).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Exam result updated successfully", "student": view })))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde_json::{Value, json};

    use crate::api::test_support::{bearer, send, test_app};

    fn student(admin_id: u64, roll: i32, email: &str) -> Value {
        json!({
            "name": "Areeba Ali",
            "fatherName": "Junaid Ali",
            "email": email,
            "password": "secret123",
            "rollNum": roll,
            "dob": "2011-05-12",
            "phoneNumber": "03001234567",
            "emergencyContact": "03112223344",
            "address": "House 20, Street 7",
            "sclassName": "4B",
            "adminID": admin_id
        })
    }

    #[actix_web::test]
    async fn roll_number_scenario_end_to_end() {
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
        let token = reg["token"].as_str().unwrap().to_string();
        let admin_id = reg["user"]["id"].as_u64().unwrap();

        for name in ["4B", "5A"] {
            let (status, _) = send!(
                app,
                TestRequest::post()
                    .uri("/api/SclassCreate")
                    .insert_header(bearer(&token))
                    .set_json(json!({ "sclassName": name, "adminID": admin_id }))
            );
            assert_eq!(status, 201);
        }

        let (status, created) = send!(
            app,
            TestRequest::post()
                .uri("/api/StudentReg")
                .insert_header(bearer(&token))
                .set_json(student(admin_id, 2, "a@gv.edu"))
        );
        assert_eq!(status, 201);
        assert_eq!(created["sclass"]["sclassName"], "4B");
        assert!(created.get("password").is_none());

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/StudentReg")
                .insert_header(bearer(&token))
                .set_json(student(admin_id, 2, "b@gv.edu"))
        );
        assert_eq!(status, 409);
        assert_eq!(body["message"], "Roll Number already exists in this class");

        let mut other_class = student(admin_id, 2, "c@gv.edu");
        other_class["sclassName"] = json!("5A");
        let (status, _) = send!(
            app,
            TestRequest::post()
                .uri("/api/StudentReg")
                .insert_header(bearer(&token))
                .set_json(other_class)
        );
        assert_eq!(status, 201);

        // the student signs in by roll number and reads only their own record
        let (status, login) = send!(
            app,
            TestRequest::post().uri("/Login").set_json(json!({
                "rollNum": 2,
                "studentName": "Areeba Ali",
                "password": "secret123"
            }))
        );
        assert_eq!(status, 200);
        assert_eq!(login["role"], "Student");
        let student_token = login["token"].as_str().unwrap().to_string();
        let own_id = login["user"]["id"].as_u64().unwrap();

        let (status, _) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/Student/{own_id}"))
                .insert_header(bearer(&student_token))
        );
        assert_eq!(status, 200);

        let (status, body) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/Students/{admin_id}"))
                .insert_header(bearer(&student_token))
        );
        assert_eq!(status, 403);
        assert_eq!(body["kind"], "ForbiddenError");
    }

    #[actix_web::test]
    async fn missing_fields_are_listed() {
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
        let token = reg["token"].as_str().unwrap().to_string();
        let admin_id = reg["user"]["id"].as_u64().unwrap();

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/StudentReg")
                .insert_header(bearer(&token))
                .set_json(json!({ "name": "Only a name", "adminID": admin_id }))
        );
        assert_eq!(status, 400);
        assert_eq!(body["kind"], "ValidationError");
        assert!(body["message"].as_str().unwrap().starts_with("Missing required fields: fatherName"));
    }
}

use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde_json::json;

use crate::{
    api::{Store, message, require_school, require_student_access},
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        marks::{Marks, MarksPatch},
        role::Role,
    },
    service::{
        marks::{self, MarksInput, MarksView},
        roster,
    },
    store::MarksFilter,
};

/// Admins of the student's school, or the teacher who recorded the marks.
async fn editable_marks(store: &Store, auth: &AuthUser, marks_id: u64) -> Result<Marks, ApiError> {
    let record = marks::find_marks(store.get_ref(), marks_id).await?;
    match auth.role {
        Role::Teacher if record.teacher_id == auth.principal_id => Ok(record),
        Role::Admin => {
            let student = roster::find_student(store.get_ref(), record.student_id).await?;
            require_school(store.get_ref(), auth, student.school_id).await?;
            Ok(record)
        }
        _ => Err(ApiError::forbidden("Access denied: not your marks record")),
    }
}

/// Record marks of one assessment
#[utoipa::path(
    post,
    path = "/api/marks/add",
    request_body = MarksInput,
    responses(
        (status = 201, description = "Marks added", body = Marks),
        (status = 400, description = "Negative marks or missing teacher"),
        (status = 404, description = "Student, subject or teacher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Marks"
)]
pub async fn add_marks(auth: AuthUser, store: Store, payload: web::Json<MarksInput>) -> Result<impl Responder, ApiError> {
    auth.require_role(&[Role::Admin, Role::Teacher])?;
    let mut input = payload.into_inner();
    if auth.role == Role::Teacher {
        input.teacher_id = Some(auth.principal_id);
    }

    let student = roster::find_student(store.get_ref(), input.student_id).await?;
    require_school(store.get_ref(), &auth, student.school_id).await?;

    let record = marks::add_marks(store.get_ref(), input, Utc::now()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Marks added successfully", "marks": record })))
}

/// Marks recorded by a teacher
#[utoipa::path(
    get,
    path = "/api/marks/teacher/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Marks, newest first", body = [MarksView]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Marks"
)]
pub async fn teacher_marks(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let teacher_id = path.into_inner();
    match auth.role {
        Role::Teacher if auth.principal_id == teacher_id => {}
        Role::Admin => {
            let teacher = roster::find_teacher(store.get_ref(), teacher_id).await?;
            require_school(store.get_ref(), &auth, teacher.school_id).await?;
        }
        _ => return Err(ApiError::forbidden("Access denied: not your marks")),
    }
    Ok(HttpResponse::Ok().json(marks::list_marks(store.get_ref(), MarksFilter::Teacher(teacher_id)).await?))
}

/// Marks of a student; students read only their own
#[utoipa::path(
    get,
    path = "/api/marks/student/{id}",
    params(("id" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Marks, newest first", body = [MarksView]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Marks"
)]
pub async fn student_marks(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let student_id = path.into_inner();
    require_student_access(store.get_ref(), &auth, student_id).await?;
    Ok(HttpResponse::Ok().json(marks::list_marks(store.get_ref(), MarksFilter::Student(student_id)).await?))
}

#[utoipa::path(
    get,
    path = "/api/marks/subject/{id}",
    params(("id" = u64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Marks, newest first", body = [MarksView]),
        (status = 404, description = "Subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Marks"
)]
pub async fn subject_marks(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_role(&[Role::Admin, Role::Teacher])?;
    let subject = roster::find_subject(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, subject.school_id).await?;
    Ok(HttpResponse::Ok().json(marks::list_marks(store.get_ref(), MarksFilter::Subject(subject.id)).await?))
}

#[utoipa::path(
    put,
    path = "/api/marks/{id}",
    params(("id" = u64, Path, description = "Marks record id")),
    request_body = MarksPatch,
    responses(
        (status = 200, description = "Marks updated", body = MarksView),
        (status = 400, description = "Marks cannot be negative"),
        (status = 404, description = "Marks record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Marks"
)]
pub async fn update_marks(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<MarksPatch>,
) -> Result<impl Responder, ApiError> {
    let record = editable_marks(&store, &auth, path.into_inner()).await?;
    let view = marks::update_marks(store.get_ref(), record.id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Marks updated successfully", "marks": view })))
}

#[utoipa::path(
    delete,
    path = "/api/marks/{id}",
    params(("id" = u64, Path, description = "Marks record id")),
    responses(
        (status = 200, description = "Marks record deleted"),
        (status = 404, description = "Marks record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Marks"
)]
pub async fn delete_marks(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let record = editable_marks(&store, &auth, path.into_inner()).await?;
    marks::delete_marks(store.get_ref(), record.id).await?;
    Ok(message("Marks record deleted successfully"))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde_json::json;

    use crate::api::test_support::{bearer, send, test_app};

    #[actix_web::test]
    async fn teacher_records_marks_and_student_reads_them() {
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
        let (_, subjects) = send!(
            app,
            TestRequest::post()
                .uri("/api/SubjectCreate")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "subjects": [{ "subName": "Math" }],
                    "sclassId": class["id"],
                    "adminID": admin_id
                }))
        );
        let subject_id = subjects[0]["id"].as_u64().unwrap();

        send!(
            app,
            TestRequest::post()
                .uri("/api/TeacherReg")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "name": "Sara Khan",
                    "email": "t@gv.edu",
                    "password": "teach123",
                    "adminID": admin_id
                }))
        );
        let mut student_ids = Vec::new();
        for (roll, email) in [(1, "s1@gv.edu"), (2, "s2@gv.edu")] {
            let (_, student) = send!(
                app,
                TestRequest::post()
                    .uri("/api/StudentReg")
                    .insert_header(bearer(&admin))
                    .set_json(json!({
                        "name": "Areeba Ali",
                        "fatherName": "Junaid Ali",
                        "email": email,
                        "password": "secret123",
                        "rollNum": roll,
                        "dob": "2011-05-12",
                        "phoneNumber": "1",
                        "emergencyContact": "2",
                        "address": "Street 7",
                        "sclassName": "4B",
                        "adminID": admin_id
                    }))
            );
            student_ids.push(student["id"].as_u64().unwrap());
        }

        let (_, login) = send!(
            app,
            TestRequest::post()
                .uri("/Login")
                .set_json(json!({ "email": "t@gv.edu", "password": "teach123" }))
        );
        let teacher = login["token"].as_str().unwrap().to_string();

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/marks/add")
                .insert_header(bearer(&teacher))
                .set_json(json!({
                    "studentId": student_ids[0],
                    "subjectId": subject_id,
                    "assessmentType": "Mid Term",
                    "topic": "Fractions",
                    "obtainedMarks": -1,
                    "totalMarks": 50
                }))
        );
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Marks cannot be negative");

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/marks/add")
                .insert_header(bearer(&teacher))
                .set_json(json!({
                    "studentId": student_ids[0],
                    "subjectId": subject_id,
                    "assessmentType": "Mid Term",
                    "topic": "Fractions",
                    "obtainedMarks": 42,
                    "totalMarks": 50
                }))
        );
        assert_eq!(status, 201);
        let marks_id = body["marks"]["id"].as_u64().unwrap();

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/marks/add")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "studentId": student_ids[0],
                    "subjectId": subject_id,
                    "obtainedMarks": 10,
                    "totalMarks": 10
                }))
        );
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Teacher ID is required");

        let (_, login) = send!(
            app,
            TestRequest::post()
                .uri("/Login")
                .set_json(json!({ "email": "s1@gv.edu", "password": "secret123" }))
        );
        let student = login["token"].as_str().unwrap().to_string();

        let (status, list) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/marks/student/{}", student_ids[0]))
                .insert_header(bearer(&student))
        );
        assert_eq!(status, 200);
        assert_eq!(list[0]["subjectName"], "Math");
        assert_eq!(list[0]["teacherName"], "Sara Khan");
        assert_eq!(list[0]["className"], "4B");

        let (status, _) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/marks/student/{}", student_ids[1]))
                .insert_header(bearer(&student))
        );
        assert_eq!(status, 403);

        let (status, body) = send!(
            app,
            TestRequest::put()
                .uri(&format!("/api/marks/{marks_id}"))
                .insert_header(bearer(&teacher))
                .set_json(json!({ "obtainedMarks": 45 }))
        );
        assert_eq!(status, 200);
        assert_eq!(body["marks"]["obtainedMarks"], 45.0);

        let (status, _) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/marks/{marks_id}"))
                .insert_header(bearer(&admin))
        );
        assert_eq!(status, 200);

        let (status, body) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/marks/{marks_id}"))
                .insert_header(bearer(&admin))
        );
        assert_eq!(status, 404);
        assert_eq!(body["message"], "Marks record not found");
    }
}

use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde_json::json;

use crate::{
    api::{Store, message},
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        homework::{Homework, HomeworkPatch, Submission},
        role::Role,
    },
    service::{
        homework::{self, GradeInput, HomeworkInput, HomeworkPage, HomeworkQuery, StudentHomework, SubmissionInput},
        roster,
    },
};

/// Assign homework to a class of the teacher's school
#[utoipa::path(
    post,
    path = "/api/Homework",
    request_body = HomeworkInput,
    responses(
        (status = 201, description = "Homework created", body = Homework),
        (status = 400, description = "Due date must be in the future"),
        (status = 403, description = "Only teachers create homework")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn create_homework(
    auth: AuthUser,
    store: Store,
    payload: web::Json<HomeworkInput>,
) -> Result<impl Responder, ApiError> {
    auth.require_teacher()?;
    let homework = homework::create_homework(store.get_ref(), auth.principal_id, payload.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Homework created successfully", "homework": homework })))
}

/// Paginated homework of one class, newest first
#[utoipa::path(
    get,
    path = "/api/Homework/Class/{className}",
    params(
        ("className" = String, Path, description = "Class name, e.g. 4B"),
        HomeworkQuery
    ),
    responses(
        (status = 200, description = "One page of homework", body = HomeworkPage),
        (status = 400, description = "Unknown status filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn homework_by_class(
    auth: AuthUser,
    store: Store,
    path: web::Path<String>,
    query: web::Query<HomeworkQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_role(&[Role::Admin, Role::Teacher])?;
    let school_id = roster::principal_school(store.get_ref(), &auth).await?;

    let page = homework::homework_by_class(store.get_ref(), school_id, &path, &query, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Homework of the calling student's class with their submission state
#[utoipa::path(
    get,
    path = "/api/Homework/Student",
    responses(
        (status = 200, description = "Homework sorted by due date", body = [StudentHomework]),
        (status = 403, description = "Students only")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn student_homework(auth: AuthUser, store: Store) -> Result<impl Responder, ApiError> {
    auth.require_student()?;
    let homework = homework::student_homework(store.get_ref(), auth.principal_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({ "homework": homework })))
}

/// Homework created by the calling teacher
#[utoipa::path(
    get,
    path = "/api/Homework/Teacher",
    params(HomeworkQuery),
    responses(
        (status = 200, description = "Homework of the teacher", body = [Homework]),
        (status = 403, description = "Teachers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn teacher_homework(
    auth: AuthUser,
    store: Store,
    query: web::Query<HomeworkQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_teacher()?;
    let homework = homework::homework_by_teacher(store.get_ref(), auth.principal_id, &query, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({ "homework": homework })))
}

/// Hand in homework; one submission per student, Late after the due date
#[utoipa::path(
    post,
    path = "/api/Homework/Submit/{homeworkId}",
    params(("homeworkId" = u64, Path, description = "Homework id")),
    request_body = SubmissionInput,
    responses(
        (status = 200, description = "Homework submitted", body = Submission),
        (status = 403, description = "Homework is not assigned to your class"),
        (status = 404, description = "Homework not found"),
        (status = 409, description = "Homework already submitted")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn submit_homework(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<SubmissionInput>,
) -> Result<impl Responder, ApiError> {
    auth.require_student()?;
    let submission = homework::submit_homework(
        store.get_ref(),
        auth.principal_id,
        path.into_inner(),
        payload.into_inner(),
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Homework submitted successfully",
        "status": submission.status,
        "submission": submission
    })))
}

#[utoipa::path(
    put,
    path = "/api/Homework/{homeworkId}",
    params(("homeworkId" = u64, Path, description = "Homework id")),
    request_body = HomeworkPatch,
    responses(
        (status = 200, description = "Homework updated", body = Homework),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Homework not found or unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn update_homework(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<HomeworkPatch>,
) -> Result<impl Responder, ApiError> {
    auth.require_teacher()?;
    let homework = homework::update_homework(
        store.get_ref(),
        auth.principal_id,
        path.into_inner(),
        payload.into_inner(),
        Utc::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Homework updated successfully", "homework": homework })))
}

#[utoipa::path(
    delete,
    path = "/api/Homework/{homeworkId}",
    params(("homeworkId" = u64, Path, description = "Homework id")),
    responses(
        (status = 200, description = "Homework deleted"),
        (status = 404, description = "Homework not found or unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn delete_homework(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_teacher()?;
    homework::delete_homework(store.get_ref(), auth.principal_id, path.into_inner()).await?;
    Ok(message("Homework deleted successfully"))
}

/// Grade one student's submission
#[utoipa::path(
    put,
    path = "/api/Homework/{homeworkId}/Grade",
    params(("homeworkId" = u64, Path, description = "Homework id")),
    request_body = GradeInput,
    responses(
        (status = 200, description = "Submission graded", body = Homework),
        (status = 400, description = "Grade must be between 0 and 100"),
        (status = 404, description = "Homework or submission not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Homework"
)]
pub async fn grade_submission(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<GradeInput>,
) -> Result<impl Responder, ApiError> {
    auth.require_teacher()?;
    let homework =
        homework::grade_submission(store.get_ref(), auth.principal_id, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Submission graded successfully", "homework": homework })))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use chrono::{Duration, Utc};
    use serde_json::json;

    use crate::api::test_support::{bearer, send, test_app};

    #[actix_web::test]
    async fn homework_from_assignment_to_grade() {
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

        send!(
            app,
            TestRequest::post()
                .uri("/api/SclassCreate")
                .insert_header(bearer(&admin))
                .set_json(json!({ "sclassName": "4B", "adminID": admin_id }))
        );
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
        send!(
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

        let (_, login) = send!(
            app,
            TestRequest::post()
                .uri("/Login")
                .set_json(json!({ "email": "t@gv.edu", "password": "teach123" }))
        );
        let teacher = login["token"].as_str().unwrap().to_string();
        let (_, login) = send!(
            app,
            TestRequest::post()
                .uri("/Login")
                .set_json(json!({ "email": "s@gv.edu", "password": "secret123" }))
        );
        let student = login["token"].as_str().unwrap().to_string();
        let student_id = login["user"]["id"].as_u64().unwrap();

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/Homework")
                .insert_header(bearer(&teacher))
                .set_json(json!({
                    "title": "Chapter 3",
                    "description": "Questions 1 to 10",
                    "subject": "Math",
                    "sclass": "4B",
                    "dueDate": (Utc::now() - Duration::hours(1)).to_rfc3339()
                }))
        );
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Due date must be in the future");

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/Homework")
                .insert_header(bearer(&teacher))
                .set_json(json!({
                    "title": "Chapter 3",
                    "description": "Questions 1 to 10",
                    "subject": "Math",
                    "sclass": "4B",
                    "dueDate": (Utc::now() + Duration::days(2)).to_rfc3339()
                }))
        );
        assert_eq!(status, 201);
        let homework_id = body["homework"]["id"].as_u64().unwrap();

        let (status, _) = send!(
            app,
            TestRequest::post()
                .uri("/api/Homework")
                .insert_header(bearer(&student))
                .set_json(json!({
                    "title": "Free period",
                    "description": "None",
                    "subject": "Math",
                    "sclass": "4B",
                    "dueDate": (Utc::now() + Duration::days(2)).to_rfc3339()
                }))
        );
        assert_eq!(status, 403);

        let (status, listing) = send!(
            app,
            TestRequest::get()
                .uri("/api/Homework/Student")
                .insert_header(bearer(&student))
        );
        assert_eq!(status, 200);
        assert_eq!(listing["homework"][0]["submissionStatus"], "Not Submitted");
        assert_eq!(listing["homework"][0]["isSubmitted"], false);

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri(&format!("/api/Homework/Submit/{homework_id}"))
                .insert_header(bearer(&student))
                .set_json(json!({ "content": "done" }))
        );
        assert_eq!(status, 200);
        assert_eq!(body["status"], "Submitted");

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri(&format!("/api/Homework/Submit/{homework_id}"))
                .insert_header(bearer(&student))
                .set_json(json!({ "content": "again" }))
        );
        assert_eq!(status, 409);
        assert_eq!(body["message"], "Homework already submitted");

        let (status, body) = send!(
            app,
            TestRequest::put()
                .uri(&format!("/api/Homework/{homework_id}/Grade"))
                .insert_header(bearer(&teacher))
                .set_json(json!({ "studentId": student_id, "grade": 91, "feedback": "Neat" }))
        );
        assert_eq!(status, 200);
        assert_eq!(body["homework"]["submissions"][0]["status"], "Graded");

        let (status, page) = send!(
            app,
            TestRequest::get()
                .uri("/api/Homework/Class/4B?status=Active&page=1&limit=5")
                .insert_header(bearer(&teacher))
        );
        assert_eq!(status, 200);
        assert_eq!(page["total"], 1);
        assert_eq!(page["totalPages"], 1);

        let (status, mine) = send!(
            app,
            TestRequest::get()
                .uri("/api/Homework/Teacher?className=4B")
                .insert_header(bearer(&teacher))
        );
        assert_eq!(status, 200);
        assert_eq!(mine["homework"].as_array().unwrap().len(), 1);

        let (status, _) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/Homework/{homework_id}"))
                .insert_header(bearer(&teacher))
        );
        assert_eq!(status, 200);

        let (status, body) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/Homework/{homework_id}"))
                .insert_header(bearer(&teacher))
        );
        assert_eq!(status, 404);
        assert_eq!(body["message"], "Homework not found or unauthorized");
    }
}

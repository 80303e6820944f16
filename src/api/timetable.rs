use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

use crate::{
    api::{Store, message, require_own_admin, require_school, require_student_access},
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        role::Role,
        timetable::{TimetableEntry, TimetablePatch},
    },
    service::{
        roster,
        timetable::{self, TimetableRequest, TimetableView},
    },
};

/// Assign subjects to class periods; an occupied slot is overwritten
#[utoipa::path(
    post,
    path = "/api/timetable",
    request_body = TimetableRequest,
    responses(
        (status = 200, description = "Timetable saved", body = Object, example = json!({
            "message": "Timetable saved successfully",
            "entries": 2
        })),
        (status = 400, description = "Entries array required"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
pub async fn add_entries(
    auth: AuthUser,
    store: Store,
    payload: web::Json<TimetableRequest>,
) -> Result<impl Responder, ApiError> {
    require_own_admin(&auth, payload.admin_id)?;
    let saved = timetable::add_entries(store.get_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Timetable saved successfully", "entries": saved })))
}

/// Weekly grid of a class
#[utoipa::path(
    get,
    path = "/api/timetable/class/{classId}",
    params(("classId" = u64, Path, description = "Class id")),
    responses(
        (status = 200, description = "Entries sorted by day and period", body = [TimetableView]),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
pub async fn class_timetable(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let sclass = roster::find_class(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, sclass.school_id).await?;
    Ok(HttpResponse::Ok().json(timetable::class_timetable(store.get_ref(), sclass.id).await?))
}

/// Slots a teacher teaches, across classes
#[utoipa::path(
    get,
    path = "/api/timetable/teacher/{teacherId}",
    params(("teacherId" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Entries with class names", body = [TimetableView]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Teacher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
pub async fn teacher_timetable(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let teacher_id = path.into_inner();
    match auth.role {
        Role::Teacher if auth.principal_id == teacher_id => {}
        Role::Admin => {
            let teacher = roster::find_teacher(store.get_ref(), teacher_id).await?;
            require_school(store.get_ref(), &auth, teacher.school_id).await?;
        }
        _ => return Err(ApiError::forbidden("Access denied: not your timetable")),
    }
    Ok(HttpResponse::Ok().json(timetable::teacher_timetable(store.get_ref(), teacher_id).await?))
}

/// Grid of the student's class
#[utoipa::path(
    get,
    path = "/api/timetable/student/{studentId}",
    params(("studentId" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Entries sorted by day and period", body = [TimetableView]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
pub async fn student_timetable(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let student_id = path.into_inner();
    require_student_access(store.get_ref(), &auth, student_id).await?;
    Ok(HttpResponse::Ok().json(timetable::student_timetable(store.get_ref(), student_id).await?))
}

/// Move an entry or change its subject
#[utoipa::path(
    put,
    path = "/api/timetable/{id}",
    params(("id" = u64, Path, description = "Timetable entry id")),
    request_body = TimetablePatch,
    responses(
        (status = 200, description = "Timetable updated", body = TimetableEntry),
        (status = 404, description = "Timetable entry not found"),
        (status = 409, description = "This timetable slot is already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
pub async fn update_entry(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<TimetablePatch>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let entry = timetable::find_entry(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, entry.school_id).await?;

    let updated = timetable::update_entry(store.get_ref(), entry.id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Timetable updated", "entry": updated })))
}

#[utoipa::path(
    delete,
    path = "/api/timetable/{id}",
    params(("id" = u64, Path, description = "Timetable entry id")),
    responses(
        (status = 200, description = "Timetable entry deleted"),
        (status = 404, description = "Timetable entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetable"
)]
pub async fn delete_entry(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let entry = timetable::find_entry(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, entry.school_id).await?;

    timetable::delete_entry(store.get_ref(), entry.id).await?;
    Ok(message("Timetable entry deleted"))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde_json::json;

    use crate::api::test_support::{bearer, send, test_app};

    #[actix_web::test]
    async fn admin_builds_a_grid_that_the_class_reads() {
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

        let (_, class) = send!(
            app,
            TestRequest::post()
                .uri("/api/SclassCreate")
                .insert_header(bearer(&token))
                .set_json(json!({ "sclassName": "4B", "adminID": admin_id }))
        );
        let class_id = class["id"].as_u64().unwrap();

        let (status, subjects) = send!(
            app,
            TestRequest::post()
                .uri("/api/SubjectCreate")
                .insert_header(bearer(&token))
                .set_json(json!({
                    "subjects": [{ "subName": "Math" }, { "subName": "Urdu" }],
                    "sclassId": class_id,
                    "adminID": admin_id
                }))
        );
        assert_eq!(status, 201);
        let math = subjects[0]["id"].as_u64().unwrap();
        let urdu = subjects[1]["id"].as_u64().unwrap();

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/timetable")
                .insert_header(bearer(&token))
                .set_json(json!({
                    "adminID": admin_id,
                    "entries": [
                        { "classId": class_id, "day": "Tuesday", "periodNumber": 1, "subject": math },
                        { "classId": class_id, "day": "Monday", "periodNumber": 1, "subjectId": urdu }
                    ]
                }))
        );
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Timetable saved successfully");

        let (status, grid) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/timetable/class/{class_id}"))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, 200);
        assert_eq!(grid[0]["day"], "Monday");
        assert_eq!(grid[0]["subjectName"], "Urdu");
        assert_eq!(grid[1]["subjectName"], "Math");

        let entry_id = grid[1]["id"].as_u64().unwrap();
        let (status, body) = send!(
            app,
            TestRequest::put()
                .uri(&format!("/api/timetable/{entry_id}"))
                .insert_header(bearer(&token))
                .set_json(json!({ "day": "Monday" }))
        );
        assert_eq!(status, 409);
        assert_eq!(body["message"], "This timetable slot is already taken");

        let (status, _) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/timetable/{entry_id}"))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, 200);

        let (status, body) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/timetable/{entry_id}"))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, 404);
        assert_eq!(body["message"], "Timetable entry not found");
    }
}

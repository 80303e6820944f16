use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    api::{Store, require_own_admin, require_school},
    auth::auth::AuthUser,
    error::ApiError,
    model::{role::Role, sclass::Sclass, student::Student},
    service::{
        cascade::CascadeReport,
        roster::{self, ClassDetail},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    #[schema(example = "4B")]
    pub sclass_name: String,
    #[serde(rename = "adminID")]
    #[schema(example = 1)]
    pub admin_id: u64,
}

/// Create a class in the admin's school
#[utoipa::path(
    post,
    path = "/api/SclassCreate",
    request_body = CreateClass,
    responses(
        (status = 201, description = "Class created", body = Sclass),
        (status = 400, description = "Class name is required"),
        (status = 404, description = "Admin not found"),
        (status = 409, description = "Sorry this class name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn create_class(
    auth: AuthUser,
    store: Store,
    payload: web::Json<CreateClass>,
) -> Result<impl Responder, ApiError> {
    require_own_admin(&auth, payload.admin_id)?;
    let sclass = roster::create_class(store.get_ref(), payload.admin_id, &payload.sclass_name).await?;
    Ok(HttpResponse::Created().json(sclass))
}

/// Classes of the admin's school
#[utoipa::path(
    get,
    path = "/api/SclassList/{id}",
    params(("id" = u64, Path, description = "Admin id")),
    responses(
        (status = 200, description = "Classes of the school", body = [Sclass]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn list_classes(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let admin_id = path.into_inner();
    require_own_admin(&auth, admin_id)?;
    Ok(HttpResponse::Ok().json(roster::list_classes(store.get_ref(), admin_id).await?))
}

/// Class with its school name and teachers
#[utoipa::path(
    get,
    path = "/api/Sclass/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class found", body = ClassDetail),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn class_detail(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let detail = roster::class_detail(store.get_ref(), path.into_inner()).await?;
    if let Some(school) = &detail.school {
        require_school(store.get_ref(), &auth, school.id).await?;
    }
    Ok(HttpResponse::Ok().json(detail))
}

/// Students enrolled in a class
#[utoipa::path(
    get,
    path = "/api/Sclass/Students/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses(
        (status = 200, description = "Students of the class", body = [Student]),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn class_students(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_role(&[Role::Admin, Role::Teacher])?;
    let sclass = roster::find_class(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, sclass.school_id).await?;
    Ok(HttpResponse::Ok().json(roster::class_students(store.get_ref(), sclass.id).await?))
}

/// Delete a class with its students, subjects, teachers, timetable and attendance
#[utoipa::path(
    delete,
    path = "/api/Sclass/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class deleted", body = CascadeReport),
        (status = 404, description = "Class not found"),
        (status = 500, description = "Cascade stopped part way; retry to resume")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn delete_class(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let sclass = roster::find_class(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, sclass.school_id).await?;

    let report = roster::delete_class(store.get_ref(), sclass.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": report.to_string(), "report": report })))
}

/// Delete every class of the admin's school with everything attached to them
#[utoipa::path(
    delete,
    path = "/api/Sclasses/{id}",
    params(("id" = u64, Path, description = "Admin id")),
    responses(
        (status = 200, description = "School cleared", body = CascadeReport),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Cascade stopped part way; retry to resume")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn delete_school_classes(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let admin_id = path.into_inner();
    require_own_admin(&auth, admin_id)?;

    let report = roster::delete_school(store.get_ref(), admin_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": report.to_string(), "report": report })))
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde_json::json;

    use crate::api::test_support::{bearer, send, test_app};

    #[actix_web::test]
    async fn admin_creates_lists_and_deletes_classes() {
        let app = test_app!();

        let (status, body) = send!(
            app,
            TestRequest::post().uri("/AdminReg").set_json(json!({
                "name": "Head",
                "email": "head@gv.edu",
                "password": "admin123",
                "schoolName": "Green Valley"
            }))
        );
        assert_eq!(status, 201);
        let token = body["token"].as_str().unwrap().to_string();
        let admin_id = body["user"]["id"].as_u64().unwrap();

        let (status, class) = send!(
            app,
            TestRequest::post()
                .uri("/api/SclassCreate")
                .insert_header(bearer(&token))
                .set_json(json!({ "sclassName": "4B", "adminID": admin_id }))
        );
        assert_eq!(status, 201);

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/SclassCreate")
                .insert_header(bearer(&token))
                .set_json(json!({ "sclassName": "4B", "adminID": admin_id }))
        );
        assert_eq!(status, 409);
        assert_eq!(body["kind"], "ConflictError");
        assert_eq!(body["message"], "Sorry this class name already exists");

        let (status, list) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/SclassList/{admin_id}"))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, 200);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = send!(
            app,
            TestRequest::delete()
                .uri(&format!("/api/Sclass/{}", class["id"]))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, 200);
        assert!(body["report"]["failed"].is_null());

        let (status, _) = send!(
            app,
            TestRequest::get()
                .uri(&format!("/api/Sclass/{}", class["id"]))
                .insert_header(bearer(&token))
        );
        assert_eq!(status, 404);
    }

    #[actix_web::test]
    async fn protected_routes_need_a_token() {
        let app = test_app!();

        let (status, body) = send!(app, TestRequest::get().uri("/api/SclassList/1"));
        assert_eq!(status, 401);
        assert_eq!(body["kind"], "AuthError");

        let (status, _) = send!(
            app,
            TestRequest::get()
                .uri("/api/SclassList/1")
                .insert_header(bearer("not-a-token"))
        );
        assert_eq!(status, 401);
    }
}

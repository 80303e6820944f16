use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::{Store, message, require_own_admin, require_school},
    auth::auth::AuthUser,
    error::ApiError,
    model::subject::Subject,
    service::roster::{self, SubjectDetail, SubjectInput},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjects {
    pub subjects: Vec<SubjectInput>,
    /// Class the subjects belong to.
    #[schema(example = 3)]
    pub sclass_id: u64,
    #[serde(rename = "adminID")]
    #[schema(example = 1)]
    pub admin_id: u64,
}

/// Create one or more subjects for a class
#[utoipa::path(
    post,
    path = "/api/SubjectCreate",
    request_body = CreateSubjects,
    responses(
        (status = 201, description = "Subjects created", body = [Subject]),
        (status = 400, description = "Subject name is required"),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subject"
)]
pub async fn create_subjects(
    auth: AuthUser,
    store: Store,
    payload: web::Json<CreateSubjects>,
) -> Result<impl Responder, ApiError> {
    require_own_admin(&auth, payload.admin_id)?;
    let payload = payload.into_inner();
    let created = roster::create_subjects(store.get_ref(), payload.admin_id, payload.sclass_id, payload.subjects).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Every subject of the admin's school
#[utoipa::path(
    get,
    path = "/api/AllSubjects/{id}",
    params(("id" = u64, Path, description = "Admin id")),
    responses((status = 200, description = "Subjects of the school", body = [Subject])),
    security(("bearer_auth" = [])),
    tag = "Subject"
)]
pub async fn school_subjects(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let admin_id = path.into_inner();
    require_own_admin(&auth, admin_id)?;
    Ok(HttpResponse::Ok().json(roster::school_subjects(store.get_ref(), admin_id).await?))
}

/// Subjects of a class
#[utoipa::path(
    get,
    path = "/api/ClassSubjects/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses((status = 200, description = "Subjects of the class", body = [Subject])),
    security(("bearer_auth" = [])),
    tag = "Subject"
)]
pub async fn class_subjects(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let sclass = roster::find_class(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, sclass.school_id).await?;
    Ok(HttpResponse::Ok().json(roster::class_subjects(store.get_ref(), sclass.id).await?))
}

/// Subjects of a class that no teacher teaches yet
#[utoipa::path(
    get,
    path = "/api/FreeSubjectList/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses((status = 200, description = "Unassigned subjects", body = [Subject])),
    security(("bearer_auth" = [])),
    tag = "Subject"
)]
pub async fn free_subjects(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let sclass = roster::find_class(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, sclass.school_id).await?;
    Ok(HttpResponse::Ok().json(roster::free_subjects(store.get_ref(), sclass.id).await?))
}

/// Subject with its class and teacher
#[utoipa::path(
    get,
    path = "/api/Subject/{id}",
    params(("id" = u64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Subject found", body = SubjectDetail),
        (status = 404, description = "Subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subject"
)]
pub async fn subject_detail(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let detail = roster::subject_detail(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, detail.subject.school_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/Subject/{id}",
    params(("id" = u64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Subject deleted"),
        (status = 404, description = "Subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subject"
)]
pub async fn delete_subject(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let subject = roster::find_subject(store.get_ref(), path.into_inner()).await?;
    require_school(store.get_ref(), &auth, subject.school_id).await?;

    roster::delete_subject(store.get_ref(), subject.id).await?;
    Ok(message("Subject deleted successfully"))
}

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    api::{Store, message, require_own_admin, require_school},
    auth::auth::AuthUser,
    error::ApiError,
    model::{role::Role, teacher::TeacherUpdate},
    service::roster::{self, TeacherRegistration, TeacherView},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignSubject {
    pub teacher_id: u64,
    #[schema(example = 5)]
    pub teach_subject: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignClass {
    pub teacher_id: u64,
    #[serde(alias = "sclassId")]
    #[schema(example = 3)]
    pub class_id: u64,
}

/// Look up the teacher and make sure the calling admin runs their school.
async fn managed_teacher(store: &Store, auth: &AuthUser, teacher_id: u64) -> Result<u64, ApiError> {
    auth.require_admin()?;
    let teacher = roster::find_teacher(store.get_ref(), teacher_id).await?;
    require_school(store.get_ref(), auth, teacher.school_id).await?;
    Ok(teacher.id)
}

/// Register a teacher, optionally with subjects and classes
#[utoipa::path(
    post,
    path = "/api/TeacherReg",
    request_body = TeacherRegistration,
    responses(
        (status = 201, description = "Teacher registered", body = TeacherView),
        (status = 400, description = "Missing required fields or weak password"),
        (status = 404, description = "Subject or class not found"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn register_teacher(
    auth: AuthUser,
    store: Store,
    payload: web::Json<TeacherRegistration>,
) -> Result<impl Responder, ApiError> {
    let payload = payload.into_inner();
    let admin_id = payload
        .admin_id
        .ok_or_else(|| ApiError::validation("Missing required fields: adminID"))?;
    require_own_admin(&auth, admin_id)?;

    let teacher = roster::create_teacher(store.get_ref(), payload).await?;
    Ok(HttpResponse::Created().json(teacher))
}

/// Teachers of the admin's school
#[utoipa::path(
    get,
    path = "/api/Teachers/{id}",
    params(("id" = u64, Path, description = "Admin id")),
    responses((status = 200, description = "Teachers of the school", body = [TeacherView])),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn list_teachers(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let admin_id = path.into_inner();
    require_own_admin(&auth, admin_id)?;

    let teachers = roster::list_teachers(store.get_ref(), admin_id).await?;
    if teachers.is_empty() {
        return Err(ApiError::not_found("No teachers found"));
    }
    Ok(HttpResponse::Ok().json(teachers))
}

#[utoipa::path(
    get,
    path = "/api/Teacher/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Teacher found", body = TeacherView),
        (status = 404, description = "No teacher found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn teacher_detail(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let teacher_id = path.into_inner();
    if auth.role == Role::Teacher && auth.principal_id != teacher_id {
        return Err(ApiError::forbidden("Access denied: teachers may only view their own profile"));
    }

    let view = roster::teacher_detail(store.get_ref(), teacher_id).await?;
    if let Some(school) = &view.school {
        require_school(store.get_ref(), &auth, school.id).await?;
    }
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    put,
    path = "/api/Teacher/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    request_body = TeacherUpdate,
    responses(
        (status = 200, description = "Teacher updated", body = TeacherView),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn update_teacher(
    auth: AuthUser,
    store: Store,
    path: web::Path<u64>,
    payload: web::Json<TeacherUpdate>,
) -> Result<impl Responder, ApiError> {
    let teacher_id = managed_teacher(&store, &auth, path.into_inner()).await?;
    let view = roster::update_teacher(store.get_ref(), teacher_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Delete a teacher; subjects they taught become unassigned
#[utoipa::path(
    delete,
    path = "/api/Teacher/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Teacher deleted"),
        (status = 404, description = "Teacher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn delete_teacher(auth: AuthUser, store: Store, path: web::Path<u64>) -> Result<impl Responder, ApiError> {
    let teacher_id = managed_teacher(&store, &auth, path.into_inner()).await?;
    roster::delete_teacher(store.get_ref(), teacher_id).await?;
    Ok(message("Teacher deleted successfully"))
}

/// Add a subject (and its class) to a teacher
#[utoipa::path(
    put,
    path = "/api/TeacherSubject",
    request_body = AssignSubject,
    responses(
        (status = 200, description = "Subject assigned", body = TeacherView),
        (status = 404, description = "Teacher or subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn assign_subject(
    auth: AuthUser,
    store: Store,
    payload: web::Json<AssignSubject>,
) -> Result<impl Responder, ApiError> {
    let teacher_id = managed_teacher(&store, &auth, payload.teacher_id).await?;
    let view = roster::assign_subject(store.get_ref(), teacher_id, payload.teach_subject).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Add a class to the classes a teacher teaches in
#[utoipa::path(
    put,
    path = "/api/assign-class",
    request_body = AssignClass,
    responses(
        (status = 200, description = "Teacher assigned to class successfully"),
        (status = 404, description = "Teacher or class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn assign_class(
    auth: AuthUser,
    store: Store,
    payload: web::Json<AssignClass>,
) -> Result<impl Responder, ApiError> {
    let teacher_id = managed_teacher(&store, &auth, payload.teacher_id).await?;
    let view = roster::assign_class(store.get_ref(), teacher_id, payload.class_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Teacher assigned to class successfully", "teacher": view })))
}

/// Make a teacher the class teacher (homeroom) of a class
#[utoipa::path(
    post,
    path = "/api/assign-class-teacher",
    request_body = AssignClass,
    responses(
        (status = 200, description = "Teacher assigned as class teacher successfully"),
        (status = 404, description = "Teacher or class not found"),
        (status = 409, description = "A class teacher is already assigned to this class.")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn assign_class_teacher(
    auth: AuthUser,
    store: Store,
    payload: web::Json<AssignClass>,
) -> Result<impl Responder, ApiError> {
    let teacher_id = managed_teacher(&store, &auth, payload.teacher_id).await?;
    let view = roster::assign_class_teacher(store.get_ref(), teacher_id, payload.class_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Teacher assigned as class teacher successfully",
        "teacher": view
    })))
}

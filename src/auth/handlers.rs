use actix_web::{HttpResponse, Responder, web};
use tracing::{info, instrument};

use crate::{
    auth::{
        auth::AuthUser,
        resolver::{AdminRegistration, LoginRequest, LoginResponse, admin_view, register_admin, resolve_login},
    },
    config::Config,
    error::ApiError,
    service::roster::AdminView,
    store::SchoolStore,
};

/// Sign in as admin, teacher (email) or student (email, or roll number + name)
#[utoipa::path(
    post,
    path = "/Login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "User not found"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, body),
    fields(email = ?body.email, roll_num = ?body.roll_num)
)]
pub async fn login(
    body: web::Json<LoginRequest>,
    store: web::Data<dyn SchoolStore>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Login request received");
    let resp = resolve_login(store.get_ref(), &body, &config).await?;
    Ok(HttpResponse::Ok().json(resp))
}

/// Register a school and its admin account
#[utoipa::path(
    post,
    path = "/AdminReg",
    request_body = AdminRegistration,
    responses(
        (status = 201, description = "Admin registered successfully", body = LoginResponse),
        (status = 400, description = "Missing fields or weak password"),
        (status = 409, description = "Email or school name already exists"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Auth"
)]
pub async fn admin_register(
    body: web::Json<AdminRegistration>,
    store: web::Data<dyn SchoolStore>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let resp = register_admin(store.get_ref(), body.into_inner(), &config).await?;
    Ok(HttpResponse::Created().json(resp))
}

/// Admin profile with school name. Admins may only read their own record.
#[utoipa::path(
    get,
    path = "/api/Admin/{id}",
    params(("id" = u64, Path, description = "Admin id")),
    responses(
        (status = 200, description = "Admin found", body = AdminView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No admin found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn admin_detail(
    auth: AuthUser,
    path: web::Path<u64>,
    store: web::Data<dyn SchoolStore>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let admin_id = path.into_inner();
    if auth.principal_id != admin_id {
        return Err(ApiError::forbidden("Access denied: not your account"));
    }

    let admin = store
        .find_admin(admin_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No admin found"))?;
    let view = admin_view(store.get_ref(), &admin).await?;
    Ok(HttpResponse::Ok().json(view))
}

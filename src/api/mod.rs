//! HTTP handlers. Each handler checks the caller's role and tenancy, then
//! hands over to `crate::service`.

use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::{auth::auth::AuthUser, error::ApiError, model::role::Role, service::roster, store::SchoolStore};

pub mod attendance;
pub mod classes;
pub mod homework;
pub mod marks;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod timetable;

pub type Store = web::Data<dyn SchoolStore>;

pub(crate) fn message(text: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": text }))
}

/// Admin endpoints that name an `adminID` only act on the caller's own school.
pub(crate) fn require_own_admin(auth: &AuthUser, admin_id: u64) -> Result<(), ApiError> {
    auth.require_admin()?;
    if auth.principal_id != admin_id {
        return Err(ApiError::forbidden("Access denied: not your school"));
    }
    Ok(())
}

/// Rejects callers whose account belongs to a different school.
pub(crate) async fn require_school(store: &dyn SchoolStore, auth: &AuthUser, school_id: u64) -> Result<(), ApiError> {
    if roster::principal_school(store, auth).await? != school_id {
        return Err(ApiError::forbidden("Access denied: not your school"));
    }
    Ok(())
}

/// Staff of the student's school, or the student themself.
pub(crate) async fn require_student_access(
    store: &dyn SchoolStore,
    auth: &AuthUser,
    student_id: u64,
) -> Result<(), ApiError> {
    if auth.role == Role::Student {
        if auth.principal_id != student_id {
            return Err(ApiError::forbidden("Access denied: students may only view their own records"));
        }
        return Ok(());
    }

    let student = roster::find_student(store, student_id).await?;
    require_school(store, auth, student.school_id).await
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for the HTTP tests: an app wired like `main` over a
    //! fresh in-memory store.

    use std::net::SocketAddr;

    pub fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40_000))
    }

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {token}"))
    }

    macro_rules! test_app {
        () => {{
            let store: std::sync::Arc<dyn $crate::store::SchoolStore> =
                std::sync::Arc::new($crate::store::MemoryStore::new());
            let config = $crate::config::Config::for_tests();
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(actix_web::web::Data::from(store))
                    .app_data(actix_web::web::Data::new(config.clone()))
                    .configure(|cfg| $crate::routes::configure(cfg, config)),
            )
            .await
        }};
    }

    /// Calls the app and returns the status code with the JSON body
    /// (`Value::Null` when the body is not JSON).
    macro_rules! send {
        ($app:expr, $req:expr) => {{
            let req = $req.peer_addr($crate::api::test_support::peer()).to_request();
            let resp = actix_web::test::call_service(&$app, req).await;
            let status = resp.status().as_u16();
            let body = actix_web::test::read_body(resp).await;
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
            (status, json)
        }};
    }

    pub(crate) use {send, test_app};
}

use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};

use crate::{auth::auth::authenticate, config::Config, error::ApiError};

/// Rejects requests without a valid session token and stores the resolved
/// [`AuthUser`](crate::auth::auth::AuthUser) in the request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(config) = req.app_data::<Data<Config>>().cloned() else {
        tracing::error!("App config missing");
        let resp = ApiError::Internal.error_response();
        return Ok(req.into_response(resp));
    };

    match authenticate(req.request(), &config) {
        Ok(user) => {
            tracing::debug!(principal_id = user.principal_id, role = %user.role, "Authenticated");
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(e) => {
            let resp = e.error_response();
            Ok(req.into_response(resp))
        }
    }
}

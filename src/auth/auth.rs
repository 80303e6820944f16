use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::{auth::jwt::verify_token, config::Config, error::ApiError, model::role::Role};

/// Authenticated principal of the current request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal_id: u64,
    pub role: Role,
}

/// Reads the session token from `Authorization: Bearer <t>`, falling back to the
/// legacy `x-access-token` and `token` headers. The `Bearer ` prefix is optional.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    ["Authorization", "x-access-token", "token"]
        .iter()
        .filter_map(|name| req.headers().get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.trim())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Validates the request's token and resolves its principal.
pub fn authenticate(req: &HttpRequest, config: &Config) -> Result<AuthUser, ApiError> {
    let token = extract_token(req).ok_or_else(|| ApiError::auth("No token provided"))?;
    let claims = verify_token(&token, &config.jwt_secret)?;

    let role = Role::from_token(&claims.role).ok_or_else(|| ApiError::auth("Invalid role in token"))?;

    Ok(AuthUser {
        principal_id: claims.id,
        role,
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                tracing::error!("Config missing from app data");
                return ready(Err(ApiError::Internal));
            }
        };

        ready(authenticate(req, config))
    }
}

impl AuthUser {
    /// Role check, case-insensitive by construction since roles are parsed
    /// from the token ignoring case.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Access denied: insufficient role"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Admin])
    }

    pub fn require_teacher(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Teacher])
    }

    pub fn require_student(&self) -> Result<(), ApiError> {
        self.require_role(&[Role::Student])
    }
}

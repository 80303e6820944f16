use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::ApiError, model::role::Role};

/// Session token payload. `role` is lowercase ("admin", "teacher", "student").
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: u64,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

pub fn generate_token(principal_id: u64, role: Role, config: &Config) -> Result<String, ApiError> {
    let iat = now();
    let claims = Claims {
        id: principal_id,
        role: role.token_name(),
        iat,
        exp: iat + config.token_ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        ApiError::Internal
    })
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
        ApiError::auth("Invalid or expired token")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_carries_id_and_lowercase_role() {
        let config = Config::for_tests();
        let token = generate_token(42, Role::Teacher, &config).unwrap();

        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.role, "teacher");
        assert_eq!(claims.exp - claims.iat, config.token_ttl);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let config = Config::for_tests();
        let token = generate_token(1, Role::Admin, &config).unwrap();

        let err = verify_token(&token, "some-other-secret").unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = Config::for_tests();
        let claims = Claims {
            id: 1,
            role: "admin".into(),
            iat: 1_000,
            exp: 2_000,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&token, &config.jwt_secret).is_err());
    }
}

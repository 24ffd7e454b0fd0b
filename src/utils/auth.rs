use actix_web::HttpRequest;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::utils::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (worker id)
    pub username: String,
    pub exp: usize, // Expiration time (Unix timestamp)
    pub iat: usize, // Issued at (Unix timestamp)
}

/// The authenticated worker extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub worker_id: i64,
    pub username: String,
    /// Stable per-login key (subject + issued-at), used for session-scoped
    /// state such as the home page visit counter.
    pub session_key: String,
}

pub fn issue_token(
    worker_id: i64,
    username: &str,
    config: &AppConfig,
) -> Result<String, ServiceError> {
    let now = Utc::now();
    let exp = (now + Duration::hours(24)).timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = Claims {
        sub: worker_id.to_string(),
        username: username.to_string(),
        exp,
        iat,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("JWT encoding error: {}", e);
        ServiceError::AuthenticationError("Failed to generate token".to_string())
    })?;

    Ok(token)
}

/// Extract and validate the bearer token on a request. Every screen except
/// login and the health check goes through this.
pub fn require_auth(req: &HttpRequest, config: &AppConfig) -> Result<AuthSession, ServiceError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token =
        auth_header.ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        log::warn!("JWT validation error: {}", e);
        ServiceError::Unauthorized("Invalid token".to_string())
    })?;

    let worker_id: i64 = data
        .claims
        .sub
        .parse()
        .map_err(|_| ServiceError::Unauthorized("Invalid worker ID in token".to_string()))?;

    Ok(AuthSession {
        worker_id,
        username: data.claims.username,
        session_key: format!("{}:{}", data.claims.sub, data.claims.iat),
    })
}

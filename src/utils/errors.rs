use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::auth::ErrorResponse;

#[derive(Debug, Error, Serialize, ToSchema)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
    #[error("Validation Error: {0}")]
    ValidationError(String),
    #[error("Authentication Error: {0}")]
    AuthenticationError(String),
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Unauthorized(msg) | ServiceError::AuthenticationError(msg) => {
                log::warn!("{}", self);
                HttpResponse::Unauthorized().json(ErrorResponse {
                    status: "error".to_string(),
                    message: msg.clone(),
                })
            }
            ServiceError::NotFound(msg) => {
                log::warn!("{}", self);
                HttpResponse::NotFound().json(ErrorResponse {
                    status: "error".to_string(),
                    message: msg.clone(),
                })
            }
            ServiceError::InternalError(msg) => {
                log::error!("Internal Error: {}", msg);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    status: "error".to_string(),
                    message: "Something went wrong".to_string(), // Don't expose internal details
                })
            }
            ServiceError::DatabaseError(msg) => {
                log::error!("Database Error: {}", msg);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    status: "error".to_string(),
                    message: "Database operation failed".to_string(), // Don't expose database details
                })
            }
            ServiceError::ValidationError(msg) => {
                log::warn!("{}", self);
                HttpResponse::BadRequest().json(ErrorResponse {
                    status: "error".to_string(),
                    message: msg.clone(),
                })
            }
        }
    }
}

// Convert sqlx errors to ServiceError
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ServiceError::ValidationError("A record with this value already exists".to_string())
            }
            _ => ServiceError::DatabaseError(err.to_string()),
        }
    }
}

// Convert bcrypt errors to ServiceError
impl From<bcrypt::BcryptError> for ServiceError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ServiceError::InternalError(format!("Password hashing error: {}", err))
    }
}

// Convert JWT errors to ServiceError
impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ServiceError::AuthenticationError(format!("JWT error: {}", err))
    }
}

use actix_web::{web, HttpRequest, HttpResponse, Result};
use bcrypt::verify;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::{ApiResponse, LoginRequest, LoginResponseData};
use crate::models::worker::{Worker, WorkerResponse};
use crate::utils::auth::{issue_token, require_auth};
use crate::utils::errors::ServiceError;

/// Worker login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponseData>),
        (status = 401, description = "Invalid credentials", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    login_req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/login - Login attempt for: {}", login_req.username);

    if login_req.username.trim().is_empty() {
        return Err(ServiceError::ValidationError("Username is required".to_string()));
    }
    if login_req.password.trim().is_empty() {
        return Err(ServiceError::ValidationError("Password is required".to_string()));
    }

    let worker = Worker::find_by_username(&db.pool, &login_req.username)
        .await?
        .ok_or_else(|| {
            log::warn!("Login failed: Worker not found - {}", login_req.username);
            ServiceError::Unauthorized("Invalid credentials".to_string())
        })?;

    let password_valid = verify(&login_req.password, &worker.password_hash).map_err(|e| {
        log::error!("Password verification error: {}", e);
        ServiceError::AuthenticationError("Password verification failed".to_string())
    })?;

    if !password_valid {
        log::warn!("Login failed: Invalid password for worker - {}", login_req.username);
        return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = issue_token(worker.id, &worker.username, &config)?;
    let username = worker.username.clone();
    let response_data = LoginResponseData {
        token,
        worker: WorkerResponse::build(&db.pool, worker).await?,
    };

    log::info!("Login successful for worker: {}", username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", response_data)))
}

/// Worker logout endpoint
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logout successful", body = ApiResponse<bool>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn logout(req: HttpRequest, config: web::Data<AppConfig>) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/logout");

    // Tokens are stateless; logout just confirms the caller was valid.
    let session = require_auth(&req, &config)?;

    log::info!("Worker logout: {}", session.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully logged out", true)))
}

/// Get current worker information
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Worker information retrieved", body = ApiResponse<WorkerResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_me(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/auth/me");

    let session = require_auth(&req, &config)?;
    let worker = Worker::find(&db.pool, session.worker_id).await.map_err(|_| {
        log::warn!("Worker not found for ID: {}", session.worker_id);
        ServiceError::Unauthorized("Worker not found".to_string())
    })?;

    let response = WorkerResponse::build(&db.pool, worker).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved worker data", response)))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(get_me)),
    );
}

use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::models::worker::{
    CreateWorkerRequest, UpdateWorkerRequest, Worker, WorkerDetailResponse, WorkerResponse,
    WORKER_PAGE_SIZE,
};
use crate::utils::auth::require_auth;
use crate::utils::errors::ServiceError;
use crate::utils::pagination::Page;

#[derive(Debug, Deserialize)]
pub struct WorkerListQuery {
    pub username: Option<String>,
    pub page: Option<u32>,
}

/// List workers, ascending by username, with optional username search
#[utoipa::path(
    get,
    path = "/api/workers",
    tag = "workers",
    security(("bearer_auth" = [])),
    params(
        ("username" = Option<String>, Query, description = "Case-insensitive username substring"),
        ("page" = Option<u32>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Workers retrieved successfully", body = ApiResponse<Page<WorkerResponse>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_workers(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    query: web::Query<WorkerListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/workers");

    require_auth(&req, &config)?;

    let username = query.username.as_deref().unwrap_or("");
    let page = query.page.unwrap_or(1).max(1);

    let (workers, total) = Worker::paged(&db.pool, username, page).await?;
    let mut items = Vec::with_capacity(workers.len());
    for worker in workers {
        items.push(WorkerResponse::build(&db.pool, worker).await?);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Workers retrieved successfully",
        Page::new(items, page, WORKER_PAGE_SIZE, total),
    )))
}

/// Worker detail with task, team and project aggregation
#[utoipa::path(
    get,
    path = "/api/workers/{id}",
    tag = "workers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Worker ID")),
    responses(
        (status = 200, description = "Worker retrieved successfully", body = ApiResponse<WorkerDetailResponse>),
        (status = 404, description = "Worker not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_worker(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let worker_id = path.into_inner();
    log::info!("GET /api/workers/{}", worker_id);

    require_auth(&req, &config)?;

    let detail = Worker::detail(&db.pool, worker_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Worker retrieved successfully", detail)))
}

/// Create a new worker
#[utoipa::path(
    post,
    path = "/api/workers",
    tag = "workers",
    security(("bearer_auth" = [])),
    request_body = CreateWorkerRequest,
    responses(
        (status = 201, description = "Worker created successfully", body = ApiResponse<WorkerResponse>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_worker(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    worker_req: web::Json<CreateWorkerRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/workers - Creating new worker: {}", worker_req.username);

    require_auth(&req, &config)?;

    let worker = Worker::create(&db.pool, &worker_req).await?;
    let worker_id = worker.id;
    let response = WorkerResponse::build(&db.pool, worker).await?;

    log::info!("Worker created successfully with ID: {}", worker_id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Worker created successfully", response)))
}

/// Update a worker
#[utoipa::path(
    put,
    path = "/api/workers/{id}",
    tag = "workers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Worker ID")),
    request_body = UpdateWorkerRequest,
    responses(
        (status = 200, description = "Worker updated successfully", body = ApiResponse<WorkerResponse>),
        (status = 404, description = "Worker not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_worker(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
    update_req: web::Json<UpdateWorkerRequest>,
) -> Result<HttpResponse, ServiceError> {
    let worker_id = path.into_inner();
    log::info!("PUT /api/workers/{}", worker_id);

    require_auth(&req, &config)?;

    let worker = Worker::update(&db.pool, worker_id, &update_req).await?;
    let response = WorkerResponse::build(&db.pool, worker).await?;

    log::info!("Worker updated successfully: {}", worker_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Worker updated successfully", response)))
}

/// Delete a worker
#[utoipa::path(
    delete,
    path = "/api/workers/{id}",
    tag = "workers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Worker ID")),
    responses(
        (status = 200, description = "Worker deleted successfully", body = ApiResponse<bool>),
        (status = 404, description = "Worker not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_worker(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let worker_id = path.into_inner();
    log::info!("DELETE /api/workers/{}", worker_id);

    require_auth(&req, &config)?;

    Worker::delete(&db.pool, worker_id).await?;

    log::info!("Worker deleted successfully: {}", worker_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Worker deleted successfully", true)))
}

pub fn worker_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/workers")
            .route("", web::get().to(list_workers))
            .route("", web::post().to(create_worker))
            .route("/{id}", web::get().to(get_worker))
            .route("/{id}", web::put().to(update_worker))
            .route("/{id}", web::delete().to(delete_worker)),
    );
}

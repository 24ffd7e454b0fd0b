use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::models::catalog::{
    self, CatalogEntry, CreateProjectRequest, CreateTeamRequest, NameRequest, Position, Project,
    ProjectResponse, Tag, TaskType, Team, TeamResponse,
};
use crate::models::task::Task;
use crate::utils::auth::require_auth;
use crate::utils::errors::ServiceError;

#[derive(Debug, Serialize, ToSchema)]
pub struct PositionDeleteResponse {
    pub position: String,
    /// Workers that held the deleted position.
    pub workers: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskTypeDeleteResponse {
    pub task_type: String,
    /// Tasks that carried the deleted type.
    pub tasks: Vec<String>,
}

// --- Positions -------------------------------------------------------------

/// List positions
#[utoipa::path(
    get,
    path = "/api/positions",
    tag = "positions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Positions retrieved", body = ApiResponse<Vec<CatalogEntry>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_positions(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/positions");
    require_auth(&req, &config)?;

    let positions = catalog::list::<Position>(&db.pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Positions retrieved", positions)))
}

/// Position detail
#[utoipa::path(
    get,
    path = "/api/positions/{id}",
    tag = "positions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position retrieved", body = ApiResponse<CatalogEntry>),
        (status = 404, description = "Position not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_position(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let position_id = path.into_inner();
    log::info!("GET /api/positions/{}", position_id);
    require_auth(&req, &config)?;

    let position = catalog::find::<Position>(&db.pool, position_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Position retrieved", position)))
}

/// Create a position
#[utoipa::path(
    post,
    path = "/api/positions",
    tag = "positions",
    security(("bearer_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Position created", body = ApiResponse<CatalogEntry>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_position(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    body: web::Json<NameRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/positions - Creating position: {}", body.name);
    require_auth(&req, &config)?;

    let position = catalog::create::<Position>(&db.pool, &body.name).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Position created", position)))
}

/// Rename a position
#[utoipa::path(
    put,
    path = "/api/positions/{id}",
    tag = "positions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Position ID")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Position updated", body = ApiResponse<CatalogEntry>),
        (status = 404, description = "Position not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_position(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
    body: web::Json<NameRequest>,
) -> Result<HttpResponse, ServiceError> {
    let position_id = path.into_inner();
    log::info!("PUT /api/positions/{}", position_id);
    require_auth(&req, &config)?;

    let position = catalog::update::<Position>(&db.pool, position_id, &body.name).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Position updated", position)))
}

/// Delete a position; referencing workers keep working with no position
#[utoipa::path(
    delete,
    path = "/api/positions/{id}",
    tag = "positions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position deleted", body = ApiResponse<PositionDeleteResponse>),
        (status = 404, description = "Position not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_position(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let position_id = path.into_inner();
    log::info!("DELETE /api/positions/{}", position_id);
    require_auth(&req, &config)?;

    let position = catalog::find::<Position>(&db.pool, position_id).await?;
    let workers = catalog::workers_with_position(&db.pool, position_id).await?;
    catalog::delete::<Position>(&db.pool, position_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Position deleted",
        PositionDeleteResponse {
            position: position.name,
            workers,
        },
    )))
}

// --- Task types ------------------------------------------------------------

/// List task types
#[utoipa::path(
    get,
    path = "/api/task-types",
    tag = "task-types",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Task types retrieved", body = ApiResponse<Vec<CatalogEntry>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_task_types(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/task-types");
    require_auth(&req, &config)?;

    let task_types = catalog::list::<TaskType>(&db.pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Task types retrieved", task_types)))
}

/// Create a task type
#[utoipa::path(
    post,
    path = "/api/task-types",
    tag = "task-types",
    security(("bearer_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Task type created", body = ApiResponse<CatalogEntry>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_task_type(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    body: web::Json<NameRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/task-types - Creating task type: {}", body.name);
    require_auth(&req, &config)?;

    let task_type = catalog::create::<TaskType>(&db.pool, &body.name).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Task type created", task_type)))
}

/// Delete a task type; referencing tasks keep going with no type
#[utoipa::path(
    delete,
    path = "/api/task-types/{id}",
    tag = "task-types",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Task type ID")),
    responses(
        (status = 200, description = "Task type deleted", body = ApiResponse<TaskTypeDeleteResponse>),
        (status = 404, description = "Task type not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_task_type(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let task_type_id = path.into_inner();
    log::info!("DELETE /api/task-types/{}", task_type_id);
    require_auth(&req, &config)?;

    let task_type = catalog::find::<TaskType>(&db.pool, task_type_id).await?;
    let tasks = Task::with_task_type(&db.pool, task_type_id).await?;
    catalog::delete::<TaskType>(&db.pool, task_type_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Task type deleted",
        TaskTypeDeleteResponse {
            task_type: task_type.name,
            tasks,
        },
    )))
}

// --- Tags ------------------------------------------------------------------

/// List tags
#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tags retrieved", body = ApiResponse<Vec<CatalogEntry>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_tags(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tags");
    require_auth(&req, &config)?;

    let tags = catalog::list::<Tag>(&db.pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tags retrieved", tags)))
}

/// Create a tag; tag names are not required to be unique
#[utoipa::path(
    post,
    path = "/api/tags",
    tag = "tags",
    security(("bearer_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Tag created", body = ApiResponse<CatalogEntry>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_tag(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    body: web::Json<NameRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tags - Creating tag: {}", body.name);
    require_auth(&req, &config)?;

    let tag = catalog::create::<Tag>(&db.pool, &body.name).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Tag created", tag)))
}

// --- Projects and teams ----------------------------------------------------

/// List teams
#[utoipa::path(
    get,
    path = "/api/teams",
    tag = "teams",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Teams retrieved", body = ApiResponse<Vec<CatalogEntry>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_teams(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/teams");
    require_auth(&req, &config)?;

    let teams = catalog::list::<Team>(&db.pool).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Teams retrieved", teams)))
}

/// Create a project linked to zero or more teams
#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "projects",
    security(("bearer_auth" = [])),
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ApiResponse<ProjectResponse>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_project(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/projects - Creating project: {}", body.name);
    require_auth(&req, &config)?;

    let project = Project::create(&db.pool, &body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Project created", project)))
}

/// Create a team, moving the listed workers into it
#[utoipa::path(
    post,
    path = "/api/teams",
    tag = "teams",
    security(("bearer_auth" = [])),
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = ApiResponse<TeamResponse>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_team(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateTeamRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/teams - Creating team: {}", body.name);
    require_auth(&req, &config)?;

    let team = catalog::create_team(&db.pool, &body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Team created", team)))
}

pub fn catalog_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/positions")
            .route("", web::get().to(list_positions))
            .route("", web::post().to(create_position))
            .route("/{id}", web::get().to(get_position))
            .route("/{id}", web::put().to(update_position))
            .route("/{id}", web::delete().to(delete_position)),
    )
    .service(
        web::scope("/api/task-types")
            .route("", web::get().to(list_task_types))
            .route("", web::post().to(create_task_type))
            .route("/{id}", web::delete().to(delete_task_type)),
    )
    .service(
        web::scope("/api/tags")
            .route("", web::get().to(list_tags))
            .route("", web::post().to(create_tag)),
    )
    .service(web::scope("/api/projects").route("", web::post().to(create_project)))
    .service(
        web::scope("/api/teams")
            .route("", web::get().to(list_teams))
            .route("", web::post().to(create_team)),
    );
}

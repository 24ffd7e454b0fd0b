use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::models::task::{
    deadline_warning_date, CreateTaskRequest, Task, TaskResponse, UpdateTaskRequest,
    COMPLETED_TASK_PAGE_SIZE, TASK_PAGE_SIZE,
};
use crate::utils::auth::require_auth;
use crate::utils::errors::ServiceError;
use crate::utils::pagination::{Page, PageQuery};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub name: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    #[serde(flatten)]
    pub page: Page<TaskResponse>,
    pub completed_percentage: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignedTasksResponse {
    pub items: Vec<TaskResponse>,
    /// Tasks due on or before this date should be highlighted.
    pub deadline_warning_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDeleteResponse {
    pub task: String,
    /// Workers that were assigned to the deleted task.
    pub assignees: Vec<String>,
}

async fn to_responses(db: &Database, tasks: Vec<Task>) -> Result<Vec<TaskResponse>, ServiceError> {
    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        responses.push(TaskResponse::build(&db.pool, task).await?);
    }
    Ok(responses)
}

/// List tasks, newest first, with optional name search
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("page" = Option<u32>, Query, description = "1-based page number")
    ),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<TaskListResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_tasks(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks");

    require_auth(&req, &config)?;

    let name = query.name.as_deref().unwrap_or("");
    let page = query.page.unwrap_or(1).max(1);

    let (tasks, total) = Task::paged(&db.pool, name, page).await?;
    let items = to_responses(&db, tasks).await?;

    let response = TaskListResponse {
        page: Page::new(items, page, TASK_PAGE_SIZE, total),
        completed_percentage: Task::completed_percentage(&db.pool).await?,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success("Tasks retrieved successfully", response)))
}

/// List completed tasks
#[utoipa::path(
    get,
    path = "/api/tasks/completed",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("page" = Option<u32>, Query, description = "1-based page number")),
    responses(
        (status = 200, description = "Completed tasks retrieved", body = ApiResponse<Page<TaskResponse>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_completed_tasks(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks/completed");

    require_auth(&req, &config)?;

    let page = query.page();
    let (tasks, total) = Task::completed_page(&db.pool, page).await?;
    let items = to_responses(&db, tasks).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Completed tasks retrieved",
        Page::new(items, page, COMPLETED_TASK_PAGE_SIZE, total),
    )))
}

/// List tasks assigned to the current worker
#[utoipa::path(
    get,
    path = "/api/tasks/assigned",
    tag = "tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Assigned tasks retrieved", body = ApiResponse<AssignedTasksResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_assigned_tasks(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks/assigned");

    let session = require_auth(&req, &config)?;

    let tasks = Task::assigned_to(&db.pool, session.worker_id).await?;
    let items = to_responses(&db, tasks).await?;

    let response = AssignedTasksResponse {
        items,
        deadline_warning_date: deadline_warning_date(Utc::now().date_naive()),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success("Assigned tasks retrieved", response)))
}

/// Get a specific task by ID
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task retrieved successfully", body = ApiResponse<TaskResponse>),
        (status = 404, description = "Task not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("GET /api/tasks/{}", task_id);

    require_auth(&req, &config)?;

    let task = Task::find(&db.pool, task_id).await?;
    let response = TaskResponse::build(&db.pool, task).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Task retrieved successfully", response)))
}

/// Create a new task
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created successfully", body = ApiResponse<TaskResponse>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    task_req: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tasks - Creating new task: {}", task_req.name);

    require_auth(&req, &config)?;

    let task = Task::create(&db.pool, &task_req).await?;
    let task_id = task.id;
    let response = TaskResponse::build(&db.pool, task).await?;

    log::info!("Task created successfully with ID: {}", task_id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Task created successfully", response)))
}

/// Update a task
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated successfully", body = ApiResponse<TaskResponse>),
        (status = 404, description = "Task not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
    update_req: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("PUT /api/tasks/{}", task_id);

    require_auth(&req, &config)?;

    let task = Task::update(&db.pool, task_id, &update_req).await?;
    let response = TaskResponse::build(&db.pool, task).await?;

    log::info!("Task updated successfully: {}", task_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Task updated successfully", response)))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted successfully", body = ApiResponse<TaskDeleteResponse>),
        (status = 404, description = "Task not found", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("DELETE /api/tasks/{}", task_id);

    require_auth(&req, &config)?;

    let task = Task::find(&db.pool, task_id).await?;
    let label = task.display_label();
    let assignees = Task::delete(&db.pool, task_id).await?;

    log::info!("Task deleted successfully: {}", task_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Task deleted successfully",
        TaskDeleteResponse { task: label, assignees },
    )))
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .route("/completed", web::get().to(list_completed_tasks))
            .route("/assigned", web::get().to(list_assigned_tasks))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task)),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::database::{test_db, Database};
    use crate::handlers::home::{home_config, VisitCounter};
    use crate::utils::auth::issue_token;

    macro_rules! test_app {
        ($db:expr, $config:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($db))
                    .app_data($config.clone())
                    .app_data(web::Data::new(VisitCounter::default()))
                    .configure(task_config)
                    .configure(home_config)
                    .configure(crate::handlers::auth::auth_config),
            )
            .await
        };
    }

    async fn seed_worker(db: &Database, username: &str, password: &str) -> i64 {
        // Low cost keeps the test suite fast.
        let hash = bcrypt::hash(password, 4).unwrap();
        sqlx::query_scalar(
            "INSERT INTO workers (username, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(username)
        .bind(hash)
        .fetch_one(&db.pool)
        .await
        .unwrap()
    }

    #[actix_web::test]
    async fn listing_screens_reject_unauthenticated_requests() {
        let db = test_db().await;
        let config = web::Data::new(AppConfig::for_tests());
        let app = test_app!(db, config);

        for path in ["/api/tasks", "/api/tasks/completed", "/api/tasks/assigned", "/api/home"] {
            let req = test::TestRequest::get().uri(path).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);
        }

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .set_json(json!({"name": "x", "deadline": "2024-12-31", "priority": "Low"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn task_crud_round_trip_over_http() {
        let db = test_db().await;
        let worker_id = seed_worker(&db, "jdoe", "pass1234").await;
        let config = web::Data::new(AppConfig::for_tests());
        let app = test_app!(db, config);
        let token = issue_token(worker_id, "jdoe", &config).unwrap();
        let bearer = format!("Bearer {}", token);

        // Create
        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(("Authorization", bearer.clone()))
            .set_json(json!({
                "name": "Fix bug",
                "deadline": "2024-07-21",
                "priority": "High",
                "assignees": [worker_id]
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        let task_id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["label"], "Fix bug (High, due 2024-07-21) - In Progress");
        assert_eq!(body["data"]["formatted_deadline"], "21-07-2024");

        // Assigned listing shows it with the warning date attached.
        let req = test::TestRequest::get()
            .uri("/api/tasks/assigned")
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["items"][0]["name"], "Fix bug");
        assert!(body["data"]["deadline_warning_date"].is_string());

        // Complete it, then the completed listing picks it up.
        let req = test::TestRequest::put()
            .uri(&format!("/api/tasks/{}", task_id))
            .insert_header(("Authorization", bearer.clone()))
            .set_json(json!({"is_completed": true}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/tasks?name=fix")
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["completed_percentage"], 100);

        // Delete reports the assignees that were attached.
        let req = test::TestRequest::delete()
            .uri(&format!("/api/tasks/{}", task_id))
            .insert_header(("Authorization", bearer.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["assignees"][0], "jdoe");

        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}", task_id))
            .insert_header(("Authorization", bearer))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_priority_is_a_bad_request() {
        let db = test_db().await;
        let worker_id = seed_worker(&db, "jdoe", "pass1234").await;
        let config = web::Data::new(AppConfig::for_tests());
        let app = test_app!(db, config);
        let token = issue_token(worker_id, "jdoe", &config).unwrap();

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({"name": "x", "deadline": "2024-12-31", "priority": "Critical"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn login_issues_a_usable_token_and_home_counts_visits() {
        let db = test_db().await;
        seed_worker(&db, "jdoe", "pass1234").await;
        let config = web::Data::new(AppConfig::for_tests());
        let app = test_app!(db, config);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "jdoe", "password": "pass1234"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let bearer = format!("Bearer {}", token);
        for expected in 1..=2 {
            let req = test::TestRequest::get()
                .uri("/api/home")
                .insert_header(("Authorization", bearer.clone()))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["num_visits"], expected);
            assert_eq!(body["data"]["num_workers"], 1);
        }

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "jdoe", "password": "wrong"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

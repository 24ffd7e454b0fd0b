use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod database;
mod handlers;
mod models;
mod utils;

use crate::config::AppConfig;
use crate::database::Database;
use crate::handlers::home::VisitCounter;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::home::home,
        handlers::task::list_tasks,
        handlers::task::list_completed_tasks,
        handlers::task::list_assigned_tasks,
        handlers::task::get_task,
        handlers::task::create_task,
        handlers::task::update_task,
        handlers::task::delete_task,
        handlers::worker::list_workers,
        handlers::worker::get_worker,
        handlers::worker::create_worker,
        handlers::worker::update_worker,
        handlers::worker::delete_worker,
        handlers::catalog::list_positions,
        handlers::catalog::get_position,
        handlers::catalog::create_position,
        handlers::catalog::update_position,
        handlers::catalog::delete_position,
        handlers::catalog::list_task_types,
        handlers::catalog::create_task_type,
        handlers::catalog::delete_task_type,
        handlers::catalog::list_tags,
        handlers::catalog::create_tag,
        handlers::catalog::create_project,
        handlers::catalog::list_teams,
        handlers::catalog::create_team,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and session endpoints"),
        (name = "home", description = "Home screen aggregates"),
        (name = "tasks", description = "Task list screens and CRUD"),
        (name = "workers", description = "Worker list screens and CRUD"),
        (name = "positions", description = "Position management"),
        (name = "tags", description = "Tag management"),
        (name = "task-types", description = "Task type management"),
        (name = "projects", description = "Project management"),
        (name = "teams", description = "Team management"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize the database");

    if let (Some(username), Some(password)) =
        (&config.bootstrap_username, &config.bootstrap_password)
    {
        db.bootstrap_worker(username, password)
            .await
            .expect("Failed to create bootstrap worker");
    }

    if let Ok(stats) = db.get_stats().await {
        stats.log_stats();
    }

    log::info!(
        "Starting team task manager API on port {} ({})",
        config.port,
        config.environment
    );

    let port = config.port;
    let allowed_origins = config.frontend_urls.clone();
    let db = web::Data::new(db);
    let config = web::Data::new(config);
    let visits = web::Data::new(VisitCounter::default());

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(visits.clone())
            .configure(handlers::health_config)
            .configure(handlers::auth_config)
            .configure(handlers::home_config)
            .configure(handlers::task_config)
            .configure(handlers::worker_config)
            .configure(handlers::catalog_config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

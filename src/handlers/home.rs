use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::ApiResponse;
use crate::utils::auth::require_auth;
use crate::utils::errors::ServiceError;

/// Tokens expire after 24 hours, so counter entries idle longer than that
/// belong to sessions that can no longer authenticate.
const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-session visit counter for the home screen. Keyed by login session
/// (token subject + issued-at), so separate logins never share a count.
#[derive(Default)]
pub struct VisitCounter {
    visits: Mutex<HashMap<String, Visit>>,
}

struct Visit {
    count: u64,
    last_seen: Instant,
}

impl VisitCounter {
    pub fn record(&self, session_key: &str) -> u64 {
        self.record_at(session_key, Instant::now())
    }

    fn record_at(&self, session_key: &str, now: Instant) -> u64 {
        let mut visits = self.visits.lock().unwrap_or_else(|e| e.into_inner());
        visits.retain(|_, v| now.duration_since(v.last_seen) < SESSION_TTL);

        let visit = visits.entry(session_key.to_string()).or_insert(Visit {
            count: 0,
            last_seen: now,
        });
        visit.count += 1;
        visit.last_seen = now;
        visit.count
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeSummary {
    pub num_tasks: i64,
    pub num_workers: i64,
    pub num_positions: i64,
    pub num_projects: i64,
    pub num_completed_tasks: i64,
    pub num_incomplete_tasks: i64,
    pub num_visits: u64,
}

/// Home screen aggregates
#[utoipa::path(
    get,
    path = "/api/home",
    tag = "home",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Home summary retrieved", body = ApiResponse<HomeSummary>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn home(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    visits: web::Data<VisitCounter>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/home");

    let session = require_auth(&req, &config)?;

    let stats = db.get_stats().await.map_err(|e| {
        log::error!("Failed to load home statistics: {}", e);
        ServiceError::DatabaseError("Failed to load statistics".to_string())
    })?;

    let summary = HomeSummary {
        num_tasks: stats.tasks,
        num_workers: stats.workers,
        num_positions: stats.positions,
        num_projects: stats.projects,
        num_completed_tasks: stats.completed_tasks,
        num_incomplete_tasks: stats.incomplete_tasks,
        num_visits: visits.record(&session.session_key),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success("Home summary retrieved", summary)))
}

pub fn home_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/home", web::get().to(home));
}

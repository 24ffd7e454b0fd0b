use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::database::Database;

pub async fn health_check(db: web::Data<Database>) -> Result<HttpResponse> {
    match db.health_check().await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "status": "ok",
            "database": "connected"
        }))),
        Err(e) => {
            log::error!("Database health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Database connection failed"
            })))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    /// Initial worker created at startup when the worker table is empty.
    pub bootstrap_username: Option<String>,
    pub bootstrap_password: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://task_manager.db".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVariable("JWT_SECRET".to_string()))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidFormat("SERVER_PORT must be a valid port number".to_string())
            })?;

        // Parse allowed origins
        let frontend_urls = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        Ok(AppConfig {
            database_url,
            jwt_secret,
            environment,
            port,
            frontend_urls,
            bootstrap_username: env::var("BOOTSTRAP_USERNAME").ok(),
            bootstrap_password: env::var("BOOTSTRAP_PASSWORD").ok(),
        })
    }
}

#[cfg(test)]
impl AppConfig {
    /// Config used by handler tests; no environment access.
    pub fn for_tests() -> Self {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            environment: "test".to_string(),
            frontend_urls: vec![],
            bootstrap_username: None,
            bootstrap_password: None,
        }
    }
}

pub mod auth;
pub mod catalog;
pub mod health;
pub mod home;
pub mod task;
pub mod worker;

pub use auth::auth_config;
pub use catalog::catalog_config;
pub use health::health_config;
pub use home::home_config;
pub use task::task_config;
pub use worker::worker_config;

pub mod auth;
pub mod catalog;
pub mod task;
pub mod worker;

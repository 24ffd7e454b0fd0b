pub mod auth;
pub mod errors;
pub mod filter;
pub mod pagination;
pub mod patch;

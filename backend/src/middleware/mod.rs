pub mod auth;
pub mod host;

pub mod api;
pub mod app_error;
pub mod app_state;
pub mod config;
pub mod middleware;
pub mod models;
pub mod reports;
pub mod routes;
pub mod swagger;

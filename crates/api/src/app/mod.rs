//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and catalog service construction
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = AppServices::connect(&config.store).await?;
    Ok(router_for(services))
}

/// Router over already-built services.
pub fn router_for(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(services.router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_context)))
}

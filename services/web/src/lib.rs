mod auth;
mod cli;
mod handlers;
mod infra;
mod routes;
mod server;
mod session;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use accredited_programmes::config::AppConfig;
use accredited_programmes::error::AppError;
use metrics_exporter_prometheus::PrometheusBuilder;

pub use auth::{ROLES_HEADER, USER_HEADER};

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

/// The full router over the seeded in-memory upstreams, marked ready and without
/// the request metrics layer.
pub fn app(config: &AppConfig) -> axum::Router {
    let app_state = infra::AppState {
        readiness: Arc::new(AtomicBool::new(true)),
        metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
    };
    routes::router(
        infra::WebState::new(config, infra::in_memory_upstreams()),
        app_state,
    )
}

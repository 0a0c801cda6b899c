use crate::cli::ServeArgs;
use crate::infra::{in_memory_upstreams, AppState, WebState};
use crate::routes::router;
use accredited_programmes::config::AppConfig;
use accredited_programmes::error::AppError;
use accredited_programmes::{paths, telemetry};
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;
    paths::verify()?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let web_state = WebState::new(&config, in_memory_upstreams());
    let app = router(web_state, app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        transfer = config.features.transfer,
        find = config.features.find,
        "accredited programmes referral service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

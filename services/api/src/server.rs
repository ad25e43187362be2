use crate::cli::ServeArgs;
use crate::infra::{build_relay, open_roster, snapshot_path, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_staffing::config::AppConfig;
use tower_staffing::error::AppError;
use tower_staffing::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs, snapshot: Option<PathBuf>) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let snapshot = snapshot_path(&config, snapshot);
    let service = Arc::new(open_roster(&snapshot)?);
    let relay = build_relay(&config.relay)?;

    let app = with_service_routes(service, relay)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, snapshot = %snapshot.display(), "tower staffing service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

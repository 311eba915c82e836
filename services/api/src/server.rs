use crate::cli::ServeArgs;
use crate::infra::{load_roster, seed_demo_store, AppState, LoggingEventPublisher};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use talentflow::config::AppConfig;
use talentflow::error::AppError;
use talentflow::telemetry;
use talentflow::workflows::hiring::{HiringPipeline, InMemoryStore};
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let now = Utc::now();
    let store = Arc::new(InMemoryStore::new());
    seed_demo_store(&store, now);
    if let Some(path) = args.roster.as_deref() {
        let loaded = load_roster(&store, path, now)?;
        info!(path = %path.display(), recruiters = loaded, "roster applied");
    }

    let pipeline = Arc::new(HiringPipeline::new(
        store,
        Arc::new(LoggingEventPublisher),
        config.pipeline.clone(),
    ));

    let app = with_pipeline_routes(pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        fallback_sample_limit = config.pipeline.assignment.fallback_sample_limit,
        "hiring pipeline ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

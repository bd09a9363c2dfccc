use crate::cli::ServeArgs;
use crate::infra::{build_pipeline_service, AppState};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_pipeline::config::AppConfig;
use lead_pipeline::error::AppError;
use lead_pipeline::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pipeline_service = Arc::new(build_pipeline_service());
    if let Some(scoring) = config.tenancy.seed_scoring_config()? {
        let tenant = &config.tenancy.default_tenant;
        let replacement = pipeline_service.replace_scoring_config(tenant, scoring)?;
        info!(
            %tenant,
            fields = replacement.config.fields.len(),
            "seeded scoring configuration from file"
        );
    }

    let app = with_pipeline_routes(pipeline_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

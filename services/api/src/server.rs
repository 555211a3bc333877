use crate::cli::ServeArgs;
use crate::infra::{triage_config_from, AppState, InMemoryOpportunityRepository};
use crate::routes::with_triage_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use opportunity_ai::config::AppConfig;
use opportunity_ai::error::AppError;
use opportunity_ai::telemetry;
use opportunity_ai::workflows::triage::{
    HttpCompletionClient, OpportunityTriageService, TriageServiceError,
};
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

    let repository = Arc::new(InMemoryOpportunityRepository::default());
    let client = Arc::new(
        HttpCompletionClient::from_config(&config.provider)
            .map_err(TriageServiceError::Provider)?,
    );
    let triage_service = Arc::new(OpportunityTriageService::new(
        repository,
        client,
        triage_config_from(&config),
    ));

    let app = with_triage_routes(triage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "opportunity triage service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

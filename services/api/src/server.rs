use crate::cli::ServeArgs;
use crate::infra::{load_template, AppState, InMemoryFollowUpPublisher, InMemoryScreeningRepository};
use crate::routes::with_screening_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use feasibility_screening::config::AppConfig;
use feasibility_screening::error::AppError;
use feasibility_screening::telemetry;
use feasibility_screening::workflows::screening::ScreeningService;
use std::sync::atomic::{AtomicBool, Ordering};
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
    if let Some(path) = args.template.take() {
        config.screening.template_path = Some(path);
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let template = load_template(&config.screening)?;
    let shared_template = Arc::new(template.clone());
    let repository = Arc::new(InMemoryScreeningRepository::default());
    let alerts = Arc::new(InMemoryFollowUpPublisher::default());
    let screening_service = Arc::new(ScreeningService::new(repository, alerts, template));

    let app = with_screening_routes(screening_service)
        .layer(Extension(shared_template))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

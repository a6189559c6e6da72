use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCoursework, InMemoryPaymentGateway};
use crate::routes::with_submission_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use courseflow::config::AppConfig;
use courseflow::error::AppError;
use courseflow::telemetry;
use courseflow::workflows::assignments::submissions::SubmissionWorkflowService;
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

    let coursework = Arc::new(InMemoryCoursework::seeded());
    let payments = Arc::new(InMemoryPaymentGateway::default());
    let submission_service = Arc::new(SubmissionWorkflowService::new(coursework, payments));

    let app = with_submission_routes(submission_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "submission workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

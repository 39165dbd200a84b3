use crate::cli::ServeArgs;
use crate::infra::{fee_policy_from, AppState, InMemoryAgreementAuthority, InMemoryContractDirectory};
use crate::routes::with_agreement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use staffbridge::config::AppConfig;
use staffbridge::error::AppError;
use staffbridge::telemetry;
use staffbridge::workflows::agreements::AgreementLifecycleService;
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

    let fee_policy = fee_policy_from(&config.withdrawal);
    let authority = Arc::new(InMemoryAgreementAuthority::default());
    let contracts = Arc::new(InMemoryContractDirectory::new(fee_policy.clone()));
    let lifecycle_service = Arc::new(AgreementLifecycleService::new(
        authority,
        contracts,
        fee_policy,
    ));

    let app = with_agreement_routes(lifecycle_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "agreement lifecycle service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

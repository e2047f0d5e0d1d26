use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAuditLog, InMemoryMembershipRepository, OutboxMailer};
use crate::routes::with_membership_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use membership::config::AppConfig;
use membership::error::AppError;
use membership::telemetry;
use membership::workflows::membership::MembershipService;
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

    let membership_service = Arc::new(MembershipService::new(
        Arc::new(InMemoryMembershipRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        Arc::new(OutboxMailer::default()),
        config.membership.clone(),
    ));

    let app = with_membership_routes(membership_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        site_id = config.membership.site_id,
        "membership registry ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use loan_tracker::applications::{
    application_router, InMemoryApplicationStore, LoanApplicationService, MongoApplicationStore,
    RenderedReport, ReportFilter,
};
use loan_tracker::config::{ConfigError, StorageBackend, StorageConfig};
use loan_tracker::documents::{InMemoryDocumentStore, S3DocumentStore};
use loan_tracker::error::AppError;
use loan_tracker::reports::ReportFormat;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryService =
    LoanApplicationService<InMemoryApplicationStore, InMemoryDocumentStore>;
pub(crate) type RemoteService = LoanApplicationService<MongoApplicationStore, S3DocumentStore>;

pub(crate) fn memory_service() -> MemoryService {
    LoanApplicationService::new(
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemoryDocumentStore::default()),
    )
}

/// Clients are created once here and shared by every request.
pub(crate) async fn remote_service(storage: &StorageConfig) -> Result<RemoteService, AppError> {
    let store = MongoApplicationStore::connect(storage).await?;
    let documents = S3DocumentStore::from_env(storage.bucket.clone()).await;
    info!(
        database = %storage.database,
        collection = %storage.collection,
        bucket = %storage.bucket,
        "remote storage configured"
    );
    Ok(LoanApplicationService::new(
        Arc::new(store),
        Arc::new(documents),
    ))
}

pub(crate) async fn application_routes(storage: &StorageConfig) -> Result<Router, AppError> {
    Ok(match storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory storage; records are lost on restart");
            application_router(Arc::new(memory_service()))
        }
        StorageBackend::Remote => application_router(Arc::new(remote_service(storage).await?)),
    })
}

pub(crate) async fn render_report(
    storage: &StorageConfig,
    filter: &ReportFilter,
    format: ReportFormat,
) -> Result<RenderedReport, AppError> {
    if storage.backend == StorageBackend::Memory {
        return Err(ConfigError::ReportNeedsRemoteBackend.into());
    }
    let report = remote_service(storage)
        .await?
        .render_report(filter, format)
        .await?;
    Ok(report)
}

pub(crate) fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| ConfigError::InvalidCorsOrigin(origin.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60)))
}

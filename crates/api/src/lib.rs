//! HTTP API server for the tenant provisioning orchestrator.
//!
//! Exposes the orchestrator's boundary operations (start provisioning,
//! poll status, fetch result) plus a slug pre-check, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{AuditService, BillingService, StorageProvisioner};
use tenancy::TenantDirectory;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::provision::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<D, S, B, A>(
    state: Arc<AppState<D, S, B, A>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    D: TenantDirectory + 'static,
    S: StorageProvisioner + 'static,
    B: BillingService + 'static,
    A: AuditService + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/tenants", post(routes::provision::start::<D, S, B, A>))
        .route(
            "/tenants/check-slug",
            get(routes::provision::check_slug::<D, S, B, A>),
        )
        .route(
            "/tenants/jobs/{id}",
            get(routes::provision::status::<D, S, B, A>),
        )
        .route(
            "/tenants/jobs/{id}/result",
            get(routes::provision::result::<D, S, B, A>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// The application state wired with in-memory collaborators.
pub type DefaultAppState = AppState<
    tenancy::InMemoryTenantDirectory,
    orchestrator::InMemoryStorageProvisioner,
    orchestrator::InMemoryBillingService,
    orchestrator::InMemoryAuditService,
>;

/// Creates the default application state: in-memory coordination store,
/// tenant directory and collaborator services. The storage handle is
/// returned alongside so tests can reach its failure-injection knobs.
pub fn create_default_state(
    config: &config::Config,
) -> (
    Arc<DefaultAppState>,
    orchestrator::InMemoryStorageProvisioner,
) {
    use job_store::{InMemoryKvStore, KeyValueStore};
    use orchestrator::{
        InMemoryAuditService, InMemoryBillingService, InMemoryStorageProvisioner,
        OrchestratorConfig, ProvisioningCoordinator,
    };
    use tenancy::InMemoryTenantDirectory;

    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKvStore::new());
    let orchestrator_config = OrchestratorConfig {
        base_domain: config.base_domain.clone(),
        ..OrchestratorConfig::default()
    };

    let storage = InMemoryStorageProvisioner::new();
    let coordinator = ProvisioningCoordinator::with_config(
        store,
        InMemoryTenantDirectory::new(),
        storage.clone(),
        InMemoryBillingService::new(),
        InMemoryAuditService::new(),
        orchestrator_config,
    );

    (Arc::new(AppState { coordinator }), storage)
}

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cofound_shared::middleware::{metrics_middleware, JwtKeys};

use config::AppConfig;
use directory::ProfileDirectory;
use events::NotificationEmitter;
use services::{DiscoverySelector, LifecycleManager};
use store::ConnectionStore;

pub struct AppState {
    pub config: AppConfig,
    pub lifecycle: LifecycleManager,
    pub discovery: DiscoverySelector,
    /// `None` when no Prometheus recorder is installed (tests).
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ConnectionStore>,
        directory: Arc<dyn ProfileDirectory>,
        emitter: Arc<dyn NotificationEmitter>,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        let retry = config.retry_policy();
        let lifecycle = LifecycleManager::new(store.clone(), directory.clone(), emitter, retry);
        let discovery = DiscoverySelector::new(store, directory, retry, config.discovery_max_limit);
        Self { config, lifecycle, discovery, metrics_handle }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let jwt_keys = JwtKeys::new(&state.config.jwt_secret);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route(
            "/connections",
            post(routes::connections::create_request).get(routes::connections::list_connections),
        )
        .route("/connections/:id", delete(routes::connections::remove_connection))
        .route("/connections/:id/accept", put(routes::connections::accept_request))
        .route("/connections/:id/reject", put(routes::connections::reject_request))
        .route("/connections/:id/withdraw", delete(routes::connections::withdraw_request))
        .route("/connections/status/:profile_id", get(routes::connections::relationship_status))
        .route("/discovery", get(routes::discovery::discovery_deck))
        // Internal service-to-service endpoints (no auth)
        .route("/internal/connected-ids/:profile_id", get(routes::internal::connected_ids))
        .route("/internal/connected/:a/:b", get(routes::internal::are_connected))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(Extension(jwt_keys))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP front door for the order saga orchestrator.
//!
//! Exposes the saga trigger endpoint with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    GatewayClient, HttpInventoryService, HttpOrderLookupService, HttpPaymentService,
    OrderSagaController, SagaError,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::saga::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/health-check", get(routes::health::check))
        .route("/saga/order", post(routes::saga::place_order))
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

/// Creates the application state with services reached through the gateway.
pub fn create_state(config: &Config) -> Result<Arc<AppState>, SagaError> {
    let gateway = GatewayClient::new(config.gateway_url.clone(), config.request_timeout)?;
    let controller = OrderSagaController::with_services(
        HttpInventoryService::new(gateway.clone()),
        HttpOrderLookupService::new(gateway.clone()),
        HttpPaymentService::new(gateway),
    )?;
    Ok(AppState::new(controller))
}

//! HTTP API server for the inventory-and-order service.
//!
//! Provides REST endpoints for users, products, orders and the
//! activity log, with structured logging (tracing) and Prometheus
//! metrics. Handlers are generic over the store and activity-sink
//! backends, so the same router runs against PostgreSQL in production
//! and the in-memory backends in tests.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use activity::ActivityLog;
use axum::Router;
use axum::routing::get;
use engine::OrderEngine;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, L> {
    pub store: S,
    pub activity: L,
    pub engine: OrderEngine<S, L>,
}

/// Builds the shared state, wiring the engine to the same store and
/// sink the handlers use directly.
pub fn create_state<S, L>(store: S, activity: L) -> Arc<AppState<S, L>>
where
    S: Store + Clone,
    L: ActivityLog + Clone,
{
    let engine = OrderEngine::new(store.clone(), activity.clone());
    Arc::new(AppState {
        store,
        activity,
        engine,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, L>(state: Arc<AppState<S, L>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/stats", get(routes::stats::get::<S, L>))
        .route(
            "/users",
            get(routes::users::list::<S, L>).post(routes::users::create::<S, L>),
        )
        .route(
            "/users/{id}",
            get(routes::users::get::<S, L>)
                .put(routes::users::update::<S, L>)
                .delete(routes::users::delete::<S, L>),
        )
        .route(
            "/products",
            get(routes::products::list::<S, L>).post(routes::products::create::<S, L>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S, L>)
                .put(routes::products::update::<S, L>)
                .delete(routes::products::delete::<S, L>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S, L>).post(routes::orders::create::<S, L>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S, L>)
                .put(routes::orders::update::<S, L>)
                .delete(routes::orders::delete::<S, L>),
        )
        .route("/logs", get(routes::logs::list::<S, L>))
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

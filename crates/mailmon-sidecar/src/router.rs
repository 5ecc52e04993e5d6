//! Axum router wiring.
//!
//! - primary: `/health` and `/metrics`, each request traced and exported
//! - scrape: `/metrics` (and `/`) only, for scrapers on a separate port

use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tower_http::timeout::TimeoutLayer;

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(ops::health))
        .route("/metrics", get(ops::metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), obs::layer::trace_request))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

pub fn build_scrape_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(ops::metrics))
        .route("/metrics", get(ops::metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

//! API route definitions
//!
//! - /api/v1/meta - categories, countries and pairs with benchmark data
//! - /api/v1/benchmarks - single benchmark lookup
//! - /api/v1/forecast - run a forecast
//! - /api/v1/login - issue a session token
//! - /api/v1/forecasts - archived forecasts (token required)

use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, AppState};
use super::middleware;

/// Create all versioned API routes.
pub fn api_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/forecasts", get(handlers::get_history))
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ));

    Router::new()
        .route("/meta", get(handlers::get_meta))
        .route("/benchmarks", get(handlers::get_benchmark))
        .route("/forecast", post(handlers::post_forecast))
        .route("/login", post(handlers::post_login))
        .merge(protected)
        .with_state(state)
}

/// Health endpoint at root level
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state)
}

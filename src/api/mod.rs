//! REST API module using Axum
//!
//! Provides HTTP endpoints for the forecast service:
//! - `/health` for liveness checks
//! - `/api/v1` for benchmarks, forecasts, login and the forecast archive
//!
//! Every response uses the envelope in [`envelope`].

pub mod envelope;
pub mod handlers;
pub mod middleware;
mod routes;

pub use handlers::AppState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// `server.cors_origins` (or `FORECAST_CORS_ORIGINS`) lists allowed origins
/// for a separately hosted frontend.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return base;
    }

    let allowed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    tracing::info!(origins = %origins.join(","), "CORS: allowing configured origins");
    base.allow_origin(allowed).allow_credentials(true)
}

/// Create the complete application router.
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::health_routes(state))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&server.cors_origins))
}

//! API middleware layers.
//!
//! Provides the session token gate for protected routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::envelope::ApiErrorResponse;
use super::handlers::AppState;
use crate::auth;

/// Extract Bearer token from Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extract the `token` cookie.
fn extract_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "token")
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid session token.
///
/// The Bearer header wins over the cookie. Verified [`auth::Claims`] are
/// inserted into request extensions for the handler.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let Some(token) = extract_bearer(headers).or_else(|| extract_cookie(headers)) else {
        return ApiErrorResponse::unauthorized("Missing session token");
    };

    match auth::verify_token(&state.auth.jwt_secret, token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, path = %request.uri().path(), "Token rejected");
            ApiErrorResponse::unauthorized(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmarks::{BenchmarkStore, BenchmarkTable};
    use crate::config::AuthConfig;
    use crate::forecast::ForecastEngine;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware;
    use axum::routing::get;
    use axum::{Extension, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppState::new(
            Arc::new(BenchmarkStore::from_table(BenchmarkTable::default())),
            ForecastEngine::default(),
            AuthConfig::default(),
        );
        let router = Router::new()
            .route(
                "/private",
                get(|Extension(claims): Extension<auth::Claims>| async move { claims.sub }),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
            .with_state(state.clone());
        (router, state)
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let (app, _) = app();
        let resp = app
            .oneshot(Request::get("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bearer_token_passes_claims() {
        let (app, state) = app();
        let token = auth::issue_token(&state.auth.jwt_secret, "admin", 60);
        let resp = app
            .oneshot(
                Request::get("/private")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"admin");
    }

    #[tokio::test]
    async fn test_cookie_token_accepted() {
        let (app, state) = app();
        let token = auth::issue_token(&state.auth.jwt_secret, "admin", 60);
        let resp = app
            .oneshot(
                Request::get("/private")
                    .header("cookie", format!("theme=dark; token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let (app, _) = app();
        let token = auth::issue_token("someone-else", "admin", 60);
        let resp = app
            .oneshot(
                Request::get("/private")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_extract_cookie_ignores_other_names() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "mytoken=abc; token=xyz".parse().unwrap());
        assert_eq!(extract_cookie(&headers), Some("xyz"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "mytoken=abc".parse().unwrap());
        assert_eq!(extract_cookie(&headers), None);
    }
}

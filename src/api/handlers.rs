//! API request handlers
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or [`ApiErrorResponse`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::auth::{self, Claims};
use crate::benchmarks::{BenchmarkPair, BenchmarkStore, CountryOption};
use crate::config::{defaults, AuthConfig};
use crate::error::ForecastError;
use crate::forecast::ForecastEngine;
use crate::notify::{self, ForecastNotifier, NoopNotifier};
use crate::storage::{ArchivedForecast, ForecastArchive};
use crate::types::{
    BandedTotals, BenchmarkRecord, DeliveryMetrics, ForecastEntry, ForecastInput, PricingMode,
    Rates,
};
use crate::validation::ForecastRequest;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BenchmarkStore>,
    pub engine: ForecastEngine,
    /// Forecast log; `None` when archiving is disabled
    pub archive: Option<ForecastArchive>,
    pub notifier: Arc<dyn ForecastNotifier>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// State without archive or notifications.
    pub fn new(store: Arc<BenchmarkStore>, engine: ForecastEngine, auth: AuthConfig) -> Self {
        Self {
            store,
            engine,
            archive: None,
            notifier: Arc::new(NoopNotifier),
            auth: Arc::new(auth),
        }
    }

    pub fn with_archive(mut self, archive: ForecastArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ForecastNotifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub benchmarks: usize,
    /// Archived forecast count, absent when archiving is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub categories: Vec<String>,
    pub countries: Vec<CountryOption>,
    pub pairs: Vec<BenchmarkPair>,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkLookup {
    pub category: String,
    pub country: String,
    /// False when the default record was substituted
    pub matched: bool,
    pub benchmark: BenchmarkRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub inputs: ForecastInput,
    pub mode: PricingMode,
    pub rates: Rates,
    pub daily: DeliveryMetrics,
    pub totals: BandedTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub entries: Vec<ArchivedForecast>,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkQuery {
    pub category: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Response {
    ApiResponse::ok(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        benchmarks: state.store.len(),
        archived: state.archive.as_ref().map(ForecastArchive::count),
    })
}

/// GET /api/v1/meta
pub async fn get_meta(State(state): State<AppState>) -> Response {
    ApiResponse::ok(MetaResponse {
        categories: state.store.categories(),
        countries: state.store.countries(),
        pairs: state.store.pairs(),
    })
}

/// GET /api/v1/benchmarks?category=&country=
pub async fn get_benchmark(
    State(state): State<AppState>,
    query: Result<Query<BenchmarkQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };

    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let country = query.country.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let (Some(category), Some(country)) = (category, country) else {
        let mut fields = BTreeMap::new();
        if category.is_none() {
            fields.insert("category".to_string(), "Category is required".to_string());
        }
        if country.is_none() {
            fields.insert("country".to_string(), "Country is required".to_string());
        }
        return ApiErrorResponse::from_forecast_error(&ForecastError::InputValidation { fields });
    };

    let matched = state.store.get(category, country);
    let benchmark = matched.unwrap_or_else(|| state.store.lookup(category, country));
    ApiResponse::ok(BenchmarkLookup {
        category: category.to_string(),
        country: country.to_ascii_uppercase(),
        matched: matched.is_some(),
        benchmark,
    })
}

/// POST /api/v1/forecast
pub async fn post_forecast(
    State(state): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return ApiErrorResponse::payload_too_large(rejection.body_text())
        }
        Err(rejection) => {
            return ApiErrorResponse::from_forecast_error(&ForecastError::field(
                "body",
                rejection.body_text(),
            ))
        }
    };

    let (inputs, contact) = match request.validate() {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Rejected forecast request");
            return ApiErrorResponse::from_forecast_error(&e);
        }
    };

    let benchmark = state.store.get(&inputs.category, &inputs.country_code);
    let result = match state.engine.forecast(&inputs, benchmark.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            info!(
                category = %inputs.category,
                country = %inputs.country_code,
                mode = %inputs.mode,
                code = e.code(),
                "Forecast rejected"
            );
            return ApiErrorResponse::from_forecast_error(&e);
        }
    };

    let entry = ForecastEntry {
        inputs,
        contact,
        result,
        created_at: Utc::now(),
    };

    let archive_id = state.archive.as_ref().and_then(|archive| {
        archive
            .append(&entry)
            .map_err(|e| warn!(error = %e, "Failed to archive forecast"))
            .ok()
    });

    let country = state.store.load().country_label(&entry.inputs.country_code);
    notify::spawn_notify(Arc::clone(&state.notifier), entry.clone(), country);

    ApiResponse::ok(ForecastResponse {
        mode: entry.result.mode,
        rates: entry.result.rates,
        daily: entry.result.daily,
        totals: entry.result.totals,
        inputs: entry.inputs,
        archive_id,
    })
}

/// POST /api/v1/login
///
/// Returns the token in the body and as an HttpOnly `token` cookie.
pub async fn post_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(login) = match payload {
        Ok(p) => p,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };

    if !auth::check_credentials(&state.auth, &login.username, &login.password) {
        warn!(username = %login.username, "Login failed");
        return ApiErrorResponse::unauthorized("Invalid credentials");
    }

    let ttl = state.auth.token_ttl_secs;
    let token = auth::issue_token(&state.auth.jwt_secret, &login.username, ttl);
    info!(username = %login.username, "Login succeeded");

    let cookie = format!("token={token}; HttpOnly; Path=/; Max-Age={ttl}; SameSite=Lax");
    let mut response = ApiResponse::ok(LoginResponse {
        token,
        expires_in: ttl,
    });
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// GET /api/v1/forecasts?limit= (token required)
pub async fn get_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };
    let Some(archive) = state.archive.as_ref() else {
        return ApiErrorResponse::service_unavailable("Forecast archive is disabled");
    };

    let limit = query
        .limit
        .unwrap_or(defaults::HISTORY_PAGE_SIZE)
        .clamp(1, defaults::HISTORY_PAGE_MAX);
    let entries = archive.recent(limit);
    debug!(user = %claims.sub, limit, returned = entries.len(), "History requested");

    ApiResponse::ok(HistoryResponse {
        count: archive.count(),
        entries,
    })
}

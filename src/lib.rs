//! Goal Forecast: campaign delivery forecasting service
//!
//! Projects impressions, clicks and conversions for an advertising budget
//! from benchmark rates per (category, country).
//!
//! ## Architecture
//!
//! - **Benchmark Store**: CSV-backed rate tables, parsed once and cached
//! - **Forecast Engine**: CPM/CPC/CPA derivation with an uncertainty band
//! - **Validation**: loosely typed request bodies to range-checked inputs
//! - **API**: axum router, response envelope and session token gate
//! - **Archive / Notify**: sled forecast log and email summaries

pub mod api;
pub mod auth;
pub mod benchmarks;
pub mod config;
pub mod error;
pub mod forecast;
pub mod notify;
pub mod storage;
pub mod types;
pub mod validation;

// Re-export configuration
pub use config::{ConfigError, ServiceConfig};

// Re-export commonly used types
pub use types::{
    Band, BandedTotals, BenchmarkKey, BenchmarkRecord, Contact, DeliveryMetrics, ForecastEntry,
    ForecastInput, ForecastResult, PricingMode, Rates,
};

// Re-export core services
pub use benchmarks::{BenchmarkSource, BenchmarkStore};
pub use error::ForecastError;
pub use forecast::{ForecastEngine, UncertaintyBand};
pub use storage::{ArchiveError, ForecastArchive};
pub use validation::ForecastRequest;

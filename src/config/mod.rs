//! Service Configuration Module
//!
//! Loads [`ServiceConfig`] from TOML, applies environment overrides and
//! validates it. The resulting value is owned by `main` and handed to the
//! components that need it; there is no global config.
//!
//! ## Loading Order
//!
//! 1. `FORECAST_CONFIG` environment variable (path to TOML file)
//! 2. `forecast_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Environment overrides (`FORECAST_SERVER_ADDR`, `FORECAST_CORS_ORIGINS`,
//! `FORECAST_JWT_SECRET`, `FORECAST_EMAIL_API_KEY`) are applied on top.

mod service_config;
pub mod defaults;
pub mod validation;

pub use service_config::*;

//! Service configuration - every tunable as a TOML value
//!
//! Each section implements `Default`, so a missing file or a partial file
//! yields a runnable service. Secrets can be supplied through environment
//! variables instead of the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::benchmarks::BenchmarkSource;
use crate::forecast::UncertaintyBand;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `ServiceConfig::load()` which searches:
/// 1. `$FORECAST_CONFIG`
/// 2. `./forecast_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub benchmarks: BenchmarksConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl ServiceConfig {
    /// Load configuration using the standard search order. Never fails:
    /// unreadable or invalid files are logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged, not rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides for values that should not live in files.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("FORECAST_SERVER_ADDR") {
            self.server.addr = addr;
        }
        if let Some(origins) = lookup("FORECAST_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secret) = lookup("FORECAST_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = lookup("FORECAST_EMAIL_API_KEY") {
            self.email.api_key = key;
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check all sections for internal consistency, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.server.max_body_bytes == 0 {
            errors.push("server.max_body_bytes must be > 0".to_string());
        }

        if UncertaintyBand::new(self.forecast.band_spread).is_none() {
            errors.push(format!(
                "forecast.band_spread must be in [0, 1) (got {})",
                self.forecast.band_spread
            ));
        }

        for (i, source) in self.benchmarks.sources.iter().enumerate() {
            if source.path.as_os_str().is_empty() {
                errors.push(format!("benchmarks.sources[{i}].path must not be empty"));
            }
        }

        if self.auth.token_ttl_secs == 0 {
            errors.push("auth.token_ttl_secs must be > 0".to_string());
        }
        if self.auth.username.trim().is_empty() {
            errors.push("auth.username must not be empty".to_string());
        }

        if self.email.enabled {
            if self.email.to.trim().is_empty() {
                errors.push("email.to is required when email.enabled = true".to_string());
            }
            if self.email.api_url.trim().is_empty() {
                errors.push("email.api_url is required when email.enabled = true".to_string());
            }
        }

        if self.archive.enabled && self.archive.path.as_os_str().is_empty() {
            errors.push("archive.path is required when archive.enabled = true".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Uncertainty band from `forecast.band_spread` (validated on load).
    pub fn band(&self) -> UncertaintyBand {
        UncertaintyBand::new(self.forecast.band_spread).unwrap_or_default()
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Maximum accepted request body (bytes)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Allowed CORS origins; empty means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            max_body_bytes: default_max_body_bytes(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

fn default_max_body_bytes() -> usize {
    defaults::MAX_BODY_BYTES
}

/// Benchmark sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarksConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<BenchmarkSource>,

    /// Optional `country_code,country_name` CSV for display labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries_path: Option<PathBuf>,
}

impl Default for BenchmarksConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            countries_path: None,
        }
    }
}

fn default_sources() -> Vec<BenchmarkSource> {
    vec![BenchmarkSource::new(defaults::BENCHMARK_SOURCE_PATH)]
}

/// Forecast engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Relative half-width of the uncertainty band around totals
    #[serde(default = "default_band_spread")]
    pub band_spread: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            band_spread: default_band_spread(),
        }
    }
}

fn default_band_spread() -> f64 {
    crate::forecast::DEFAULT_SPREAD
}

/// Placeholder login credentials and token settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// HS256 signing secret
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl AuthConfig {
    /// True while the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == defaults::DEV_JWT_SECRET
    }
}

fn default_username() -> String {
    defaults::DEV_USERNAME.to_string()
}

fn default_password() -> String {
    defaults::DEV_PASSWORD.to_string()
}

fn default_jwt_secret() -> String {
    defaults::DEV_JWT_SECRET.to_string()
}

fn default_token_ttl() -> u64 {
    defaults::TOKEN_TTL_SECS
}

/// Forecast notification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_email_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_email_from")]
    pub from: String,

    /// Inbox that receives every forecast summary
    #[serde(default)]
    pub to: String,

    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_email_api_url(),
            api_key: String::new(),
            from: default_email_from(),
            to: String::new(),
            timeout_secs: default_email_timeout(),
        }
    }
}

fn default_email_api_url() -> String {
    defaults::EMAIL_API_URL.to_string()
}

fn default_email_from() -> String {
    defaults::EMAIL_FROM.to_string()
}

fn default_email_timeout() -> u64 {
    defaults::EMAIL_TIMEOUT_SECS
}

/// Append-only forecast log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_enabled")]
    pub enabled: bool,

    #[serde(default = "default_archive_path")]
    pub path: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: default_archive_enabled(),
            path: default_archive_path(),
        }
    }
}

fn default_archive_enabled() -> bool {
    true
}

fn default_archive_path() -> PathBuf {
    PathBuf::from(defaults::ARCHIVE_PATH)
}

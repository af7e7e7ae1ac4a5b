//! Service-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FORECAST_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "forecast_config.toml";

// ============================================================================
// HTTP server
// ============================================================================

pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Request bodies above this size are rejected (bytes).
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// History page size when the client does not ask for one.
pub const HISTORY_PAGE_SIZE: usize = 50;

/// Upper bound on a single history page.
pub const HISTORY_PAGE_MAX: usize = 500;

// ============================================================================
// Benchmarks
// ============================================================================

pub const BENCHMARK_SOURCE_PATH: &str = "data/benchmarks.csv";

// ============================================================================
// Auth
// ============================================================================

/// Session token lifetime (seconds). 3 600 = 1 hour.
pub const TOKEN_TTL_SECS: u64 = 3_600;

/// Development-only signing secret; a warning is logged while it is in use.
pub const DEV_JWT_SECRET: &str = "forecast-dev-secret";

pub const DEV_USERNAME: &str = "admin";
pub const DEV_PASSWORD: &str = "password123";

// ============================================================================
// Email
// ============================================================================

pub const EMAIL_API_URL: &str = "https://api.resend.com/emails";
pub const EMAIL_FROM: &str = "Forecast Tool <onboarding@resend.dev>";

/// HTTP timeout for the email API (seconds).
pub const EMAIL_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Archive
// ============================================================================

pub const ARCHIVE_PATH: &str = "./data/forecasts.db";

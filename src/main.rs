//! goal-forecast - campaign delivery forecasting service
//!
//! # Usage
//!
//! ```bash
//! # Serve with ./forecast_config.toml or built-in defaults
//! cargo run --release
//!
//! # Explicit config and extra benchmark sources
//! ./goal-forecast --config forecast.toml --benchmarks data/finance.csv
//!
//! # Print the effective configuration and exit
//! ./goal-forecast --print-config
//! ```
//!
//! # Environment Variables
//!
//! - `FORECAST_CONFIG`: Path to the TOML config file
//! - `FORECAST_SERVER_ADDR`: Bind address override
//! - `FORECAST_JWT_SECRET`: Session token signing secret
//! - `FORECAST_EMAIL_API_KEY`: Email API key
//! - `FORECAST_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use goal_forecast::api::{create_app, AppState};
use goal_forecast::benchmarks::{BenchmarkSource, BenchmarkStore};
use goal_forecast::config::ServiceConfig;
use goal_forecast::forecast::ForecastEngine;
use goal_forecast::notify;
use goal_forecast::storage::ForecastArchive;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "goal-forecast")]
#[command(about = "Campaign delivery forecasting service")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides FORECAST_CONFIG and ./forecast_config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Additional benchmark CSV source; repeatable
    #[arg(long = "benchmarks", value_name = "CSV")]
    benchmarks: Vec<PathBuf>,

    /// Directory for the forecast archive
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// File or search-order config, then env and CLI overrides.
fn resolve_config(args: &CliArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::load(),
    };
    config.apply_env();

    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }
    config
        .benchmarks
        .sources
        .extend(args.benchmarks.iter().cloned().map(BenchmarkSource::new));
    if let Some(dir) = &args.data_dir {
        config.archive.path = dir.join("forecasts.db");
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = resolve_config(&args)?;
    if args.print_config {
        print!("{}", config.to_toml().context("Failed to render config")?);
        return Ok(());
    }

    if config.auth.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set FORECAST_JWT_SECRET in production");
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  goal-forecast v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Parse benchmark sources up front so the first request is not slow
    let store = Arc::new(BenchmarkStore::new(
        config.benchmarks.sources.clone(),
        config.benchmarks.countries_path.clone(),
    ));
    if store.is_empty() {
        warn!("No benchmark data loaded; forecasts need ctrOverride until sources are added");
    }

    let engine = ForecastEngine::new(config.band());
    let notifier = notify::from_config(&config.email).context("Failed to build email client")?;
    let mut state = AppState::new(Arc::clone(&store), engine, config.auth.clone())
        .with_notifier(notifier);

    let archive = if config.archive.enabled {
        if let Some(parent) = config.archive.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create archive directory {}", parent.display())
            })?;
        }
        let archive = ForecastArchive::open(&config.archive.path).with_context(|| {
            format!("Failed to open archive at {}", config.archive.path.display())
        })?;
        info!(path = %config.archive.path.display(), entries = archive.count(), "Forecast archive ready");
        state = state.with_archive(archive.clone());
        Some(archive)
    } else {
        info!("Forecast archive disabled");
        None
    };

    let app = create_app(state, &config.server);
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!(addr = %config.server.addr, benchmarks = store.len(), "HTTP server listening");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("HTTP server error")?;

    if let Some(archive) = archive {
        if let Err(e) = archive.flush() {
            warn!(error = %e, "Failed to flush forecast archive");
        }
    }
    info!("Graceful shutdown complete");
    Ok(())
}

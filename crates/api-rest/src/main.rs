//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the ward occupancy REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `ward-run` binary loads `.env`
//! first and then serves the same router.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ward_core::{CoreConfig, WardService};

/// Main entry point for the ward REST API server
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `WARD_DATA_DIR`: Directory for persisted documents (unset: in-memory only)
/// - `WARD_TX_MAX_ATTEMPTS`: Transaction attempt budget
/// - `WARD_TX_TIMEOUT_MS`: Transaction time budget in milliseconds
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or stored documents cannot be loaded, or
/// - the HTTP server fails to bind or while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("ward_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("WARD_DATA_DIR").ok(),
        std::env::var("WARD_TX_MAX_ATTEMPTS").ok(),
        std::env::var("WARD_TX_TIMEOUT_MS").ok(),
    )?);

    match cfg.data_dir() {
        Some(dir) => tracing::info!("-- Persisting ward documents under {}", dir.display()),
        None => tracing::warn!("-- WARD_DATA_DIR not set; documents are held in memory only"),
    }

    let service = WardService::open(cfg)?;

    tracing::info!("-- Starting ward REST API on {}", addr);
    api_rest::serve(&addr, service).await
}

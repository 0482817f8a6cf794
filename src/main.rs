use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ward_core::{CoreConfig, WardService};

/// Main entry point for the ward occupancy application
///
/// Loads `.env` if present, opens the document store and serves the REST API with its
/// OpenAPI/Swagger documentation.
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WARD_DATA_DIR`: Directory for persisted documents (unset: in-memory only)
/// - `WARD_TX_MAX_ATTEMPTS`: Transaction attempt budget
/// - `WARD_TX_TIMEOUT_MS`: Transaction time budget in milliseconds
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, loading or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ward_run=info".parse()?)
                .add_directive("ward_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env_values(
        std::env::var("WARD_DATA_DIR").ok(),
        std::env::var("WARD_TX_MAX_ATTEMPTS").ok(),
        std::env::var("WARD_TX_TIMEOUT_MS").ok(),
    )?);
    if let Some(dir) = cfg.data_dir() {
        tracing::info!("++ Ward documents stored under {}", dir.display());
    }

    let service = WardService::open(cfg)?;

    tracing::info!("++ Starting ward REST on {}", rest_addr);
    api_rest::serve(&rest_addr, service).await
}

//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API without the enhancement hook.
//!
//! ## Intended use
//! Useful for development when deterministic provider text is wanted. The workspace's main
//! `syntgen-run` binary also installs the Azure OpenAI hook when it is configured.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syntgen_core::{CoreConfig, GeneratorService};

/// # Environment Variables
/// - `SYNTGEN_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `SYNTGEN_SENDING_APPLICATION`, `SYNTGEN_RECEIVING_APPLICATION`,
///   `SYNTGEN_RECEIVING_FACILITY`: MSH header overrides
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - a `SYNTGEN_*` value is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("SYNTGEN_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting syntgen REST API on {}", addr);

    let cfg = CoreConfig::from_env_values(|key| std::env::var(key).ok())?;
    let app = api_rest::router(GeneratorService::new(cfg));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

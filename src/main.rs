use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syntgen_core::{CoreConfig, GeneratorService};
use syntgen_enhance::{AzureOpenAiConfig, AzureOpenAiHook};

/// Main entry point for the syntgen application
///
/// Resolves configuration once, installs the Azure OpenAI enhancement hook when credentials
/// are present, and serves the REST API.
///
/// # Environment Variables
/// - `SYNTGEN_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SYNTGEN_SENDING_APPLICATION`: MSH.3 prefix (default: "HL7SYNTGEN")
/// - `SYNTGEN_RECEIVING_APPLICATION`: MSH.5 (default: "HEALTHLINK")
/// - `SYNTGEN_RECEIVING_FACILITY`: MSH.6 (default: "HSE")
/// - `SYNTGEN_ENHANCEMENT_TIMEOUT_MS`: enhancement budget per message (default: 8000)
/// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`: enable enhancement when both are set
/// - `AZURE_OPENAI_API_VERSION` (default: "2024-02-15-preview")
/// - `AZURE_OPENAI_DEPLOYMENT` (default: "gpt-4.1-mini")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("syntgen=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |key: &str| std::env::var(key).ok();

    let rest_addr = env("SYNTGEN_REST_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into());

    let cfg = CoreConfig::from_env_values(env)?;

    let mut service = GeneratorService::new(cfg);
    match AzureOpenAiConfig::from_env_values(
        env("AZURE_OPENAI_ENDPOINT"),
        env("AZURE_OPENAI_API_KEY"),
        env("AZURE_OPENAI_API_VERSION"),
        env("AZURE_OPENAI_DEPLOYMENT"),
    )? {
        Some(azure) => {
            tracing::info!(
                "++ Azure OpenAI enhancement enabled ({} / {})",
                azure.endpoint(),
                azure.deployment()
            );
            service = service.with_enhancement_hook(Arc::new(AzureOpenAiHook::new(azure)));
        }
        None => tracing::info!("++ Azure OpenAI not configured, using provider text only"),
    }

    tracing::info!("++ Starting syntgen REST on {}", rest_addr);

    let app = api_rest::router(service);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

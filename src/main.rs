use loan_risk_api::classifier::LoadedModel;
use loan_risk_api::config::Config;
use loan_risk_api::handlers::AppState;
use loan_risk_api::reasons::ReasonStrategy;
use loan_risk_api::routes::create_router;
use loan_risk_api::text_generation::LlmClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The model artifact (startup fails if it cannot be loaded).
/// - The text-generation client, when an API key is configured.
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Without a model no prediction is possible, so this is fatal.
    let model = LoadedModel::load(&config.model_dir, config.model_variant)
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    tracing::info!("✓ Model loaded: {}", model.variant);

    let llm = LlmClient::from_config(&config).map_err(|e| anyhow::anyhow!("{}", e))?;
    match (&llm, config.reason_strategy) {
        (Some(client), _) => tracing::info!("✓ Text-generation client initialized: {}", client.model()),
        (None, ReasonStrategy::Rules) => tracing::info!("No LLM API key set, using rule-based reasons"),
        (None, ReasonStrategy::Model) => {
            tracing::warn!("No LLM API key set, explanations will fall back")
        }
    }

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        model,
        llm,
    });

    let app = create_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

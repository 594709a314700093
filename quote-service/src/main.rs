use std::sync::Arc;

use anyhow::Context;
use quote_flow::QuoteOrchestrator;
use quote_service::{
    AppState, InstaBrainClient, OpenRouterExtractor, OriginPolicy, ServiceConfig, build_router,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quote_service=debug,quote_flow=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Quote service stopped");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    info!(config = ?config, "Loaded configuration");

    let extractor = Arc::new(OpenRouterExtractor::new(
        &config.openrouter_api_key,
        &config.llm_model,
    ));
    let quoting = Arc::new(InstaBrainClient::new(
        config.instabrain_api_url.clone(),
        config.instabrain_user_id.clone(),
        config.instabrain_access_token.clone(),
    ));

    let app_state = AppState {
        orchestrator: Arc::new(QuoteOrchestrator::new(extractor, quoting)),
        origin_policy: OriginPolicy::new(config.allowed_origin_suffixes.clone()),
    };
    let app = build_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

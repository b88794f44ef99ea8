mod config;
mod db;
mod error;
mod llm;
mod plantid;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use llm::LlmChat;
use plantid::{PlantIdClient, PlantIdentifier};
use rate_limit::{RateLimitConfig, RateLimiter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid server configuration");

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("database init failed");

    // Both providers are optional: chat and identification degrade without keys.
    let llm: Option<Arc<dyn LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured, assistant replies with setup notice");
            None
        }
    };
    let identifier: Option<Arc<dyn PlantIdentifier>> = match PlantIdClient::from_env() {
        Ok(client) => {
            tracing::info!("plant identification client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "plant identification disabled");
            None
        }
    };

    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .expect("failed to create uploads directory");

    let state = state::AppState::from_config(pool, &config)
        .with_llm(llm)
        .with_identifier(identifier)
        .with_rate_limiter(RateLimiter::new(RateLimitConfig::from_env()));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, uploads = %config.uploads_dir.display(), "garden catalog listening");
    axum::serve(listener, app).await.expect("server failed");
}

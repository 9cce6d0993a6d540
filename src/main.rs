mod agent;
mod config;
mod crawler;
mod errors;
mod models;
mod routes;
mod service;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing::info;

use crate::agent::{GeminiModel, LlmClient};
use crate::config::AppConfig;
use crate::crawler::WebCrawler;
use crate::routes::build_router;
use crate::service::answer_flow::AnswerFlow;
use crate::service::chat_service::ChatService;
use crate::service::session_store::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "page_chat=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let crawler = WebCrawler::new()?;
    let model = GeminiModel::new(&config)?;
    let flow = AnswerFlow::new(Arc::new(crawler), LlmClient::new(Arc::new(model)));
    let chat_service = ChatService::new(flow, SessionStore::new());
    info!("Using Gemini model {}", config.model);

    let app = build_router(chat_service);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}

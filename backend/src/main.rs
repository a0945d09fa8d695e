use std::sync::Arc;

use anyhow::Context;
use tower_http::services::ServeDir;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod error;
mod extract;
mod llm;
mod message;
mod notify;
mod routes;
mod store;
mod summarize;
#[cfg(test)]
mod testing;

use config::{Config, StoreKind};
use llm::OpenAiCompletions;
use notify::SlackWebhook;
use routes::AppState;
use store::{MemoryTaskStore, RedisTaskStore, TaskStore};
use summarize::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    let store: Arc<dyn TaskStore> = match config.store {
        StoreKind::Redis => {
            tracing::info!(url = %config.redis_url, "using redis task store");
            Arc::new(RedisTaskStore::open(&config.redis_url).context("invalid REDIS_URL")?)
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory task store, tasks are lost on restart");
            Arc::new(MemoryTaskStore::new())
        }
    };

    let webhook = SlackWebhook::new(config.webhook_url.clone());
    if !webhook.is_configured() {
        tracing::warn!("SLACK_WEBHOOK_URL is not set, summaries will fail");
    }
    let notifier = Arc::new(webhook);

    let mut summarizer = Summarizer::new(store.clone(), notifier.clone());
    if let Some(api_key) = config.openai_api_key.clone() {
        tracing::info!(model = %config.openai_model, "summaries use text generation");
        summarizer = summarizer.with_generator(Arc::new(OpenAiCompletions::new(
            api_key,
            config.openai_model.clone(),
            &config.openai_base_url,
        )));
    }

    let state = AppState::new(store, notifier, summarizer)
        .with_action_notifications(config.notify_actions);
    let app = routes::router(state).fallback_service(ServeDir::new(&config.static_dir));

    let address = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("backend=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

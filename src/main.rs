mod api_doc;
mod app;
mod bookings;
mod config;
mod error;
mod handlers;
mod mailer;
mod models;
mod routes;
mod state;
mod store;
mod template;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use config::{Config, StoreConfig};
use mailer::ResendMailer;
use state::AppState;
use store::{KvStore, MemoryStore, SpannerStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("inspection-booking starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store: Arc<dyn KvStore> = match &config.store {
        StoreConfig::Spanner(spanner) => Arc::new(SpannerStore::from_config(spanner).await?),
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory store; data will be lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState {
        store,
        mailer: Arc::new(ResendMailer::new(config.email.clone())?),
    };

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app::build_router(state))
        .await
        .context("Server error")?;

    Ok(())
}

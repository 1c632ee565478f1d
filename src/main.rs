mod config;
mod error;
mod http_server;
mod payload;
mod record;
mod relay;
mod template;
mod types;

use anyhow::{Context, Result};
use config::Config;
use http_server::AppState;
use record::EventLog;
use relay::{ConversationRelay, Relay};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.log_filter)?;

    let addr = config.server_addr()?;
    let relay = ConversationRelay::from_config(&config.relay)?;
    match &relay {
        Some(relay) => info!(
            endpoint = relay.endpoint(),
            repository = config.relay.repository().unwrap_or_default(),
            "Relay enabled"
        ),
        None => info!("Relay disabled, events are only printed"),
    }

    let state = AppState {
        log: EventLog::stdout(),
        relay: relay.map(|r| Arc::new(r) as Arc<dyn Relay>),
    };
    let app = http_server::router(state, config.body_limit_bytes);

    info!("🚀 Starting webhook listener server...");
    info!("📡 Listening for events on {addr}");
    info!("🔗 Forward this to your ngrok endpoint");
    info!("💡 Press Ctrl+C to stop the server");

    http_server::serve(app, addr)
        .await
        .with_context(|| format!("HTTP server failed on {addr}"))
}

fn init_tracing(fallback: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
    Ok(())
}

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use medichat_server::config::{LogFormat, LoggingSection};
use medichat_server::server::HttpServer;
use medichat_server::{RelayConfig, build_service};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,medichat_server=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!(
        model = %config.provider.model,
        required_role = %config.roles.required_role,
        "Starting Medichat relay"
    );

    let service = Arc::new(build_service(&config)?);
    let server = HttpServer::new(config.server.clone(), service);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    server.run(shutdown_rx).await
}

fn init_tracing(logging: &LoggingSection) {
    let fallback = logging
        .filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

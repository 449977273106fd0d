use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::ServerSection;
use crate::relay::RelayService;
use crate::router;

/// HTTP front of the relay
pub struct HttpServer {
    settings: ServerSection,
    service: Arc<RelayService>,
}

impl HttpServer {
    pub fn new(settings: ServerSection, service: Arc<RelayService>) -> Self {
        Self { settings, service }
    }

    /// Serve until `shutdown` fires; in-flight streams are allowed to finish
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let app = router::build_router(self.service.clone(), &self.settings);
        let addr = format!("{}:{}", self.settings.host, self.settings.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(route = %self.settings.route, "Relay listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("Relay shutting down");
            })
            .await?;

        Ok(())
    }
}

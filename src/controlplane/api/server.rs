//! API Server
//!
//! Serves the REST binding of the lifecycle API until shutdown is signalled.

use crate::error::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use super::rest::RestRouter;
use crate::controlplane::controller::Controller;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8090)),
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

pub struct ApiServer {
    config: ApiServerConfig,
    controller: Arc<Controller>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, controller: Arc<Controller>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            controller,
            shutdown_tx,
        }
    }

    /// Run the API server until it stops or shutdown is triggered
    pub async fn run(&self) -> Result<()> {
        info!("Starting API server");
        info!("  REST API: {}", self.config.rest_addr);
        info!("  Record store: {}", self.controller.gateway().store_name());

        let rest_handle = self.spawn_rest_server();

        match rest_handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("REST server error: {:?}", e);
                Err(e)
            }
            Err(e) => Err(Error::Internal(format!("REST server task failed: {}", e))),
        }
    }

    fn spawn_rest_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let addr = self.config.rest_addr;
        let controller = self.controller.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move { run_rest_server(addr, controller, shutdown_rx).await })
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn run_rest_server(
    addr: SocketAddr,
    controller: Arc<Controller>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = RestRouter::new(controller).build();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

    info!("REST API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("REST server shutting down");
        })
        .await
        .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controlplane::stores::{InMemoryRecordStore, StaticPoolInventory};
    use crate::controlplane::telemetry::NoopTelemetry;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.rest_addr.port(), 8090);
    }

    #[tokio::test]
    async fn test_shutdown_stops_server() {
        let controller = Arc::new(Controller::new(
            ControllerConfig::default(),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(StaticPoolInventory::new()),
            Arc::new(NoopTelemetry),
        ));
        let config = ApiServerConfig {
            rest_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        };
        let server = Arc::new(ApiServer::new(config, controller));

        let running = server.clone();
        let handle = tokio::spawn(async move { running.run().await });

        // Keep signalling until the listener has subscribed and exited
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                server.shutdown();
                if handle.is_finished() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            handle.await
        })
        .await
        .unwrap()
        .unwrap();

        assert!(result.is_ok());
    }
}

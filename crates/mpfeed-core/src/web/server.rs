//! HTTP server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use super::router::create_router;
use crate::state::AppState;
use crate::{Error, Result};

/// HTTP server for feeds, OPML and RPC
pub struct WebServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(state: Arc<AppState>) -> Result<Self> {
        let server = &state.config.server;
        let addr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid server address: {}", e)))?;

        Ok(Self { addr, state })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the shutdown signal flips to `true`
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let router = create_router(self.state);

        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("Web server listening on http://{}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                while shutdown.changed().await.is_ok() {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            })
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }
}

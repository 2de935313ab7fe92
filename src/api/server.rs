//! API Server
//!
//! Relay HTTP server: router, middleware stack and graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::{ChainConfig, ServerConfig};
use crate::submission::SubmissionService;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Score relay HTTP server
pub struct ApiServer {
    server: ServerConfig,
    chain: ChainConfig,
    service: Arc<SubmissionService>,
}

impl ApiServer {
    pub fn new(server: ServerConfig, chain: ChainConfig, service: Arc<SubmissionService>) -> Self {
        Self {
            server,
            chain,
            service,
        }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.app();
        let addr = self.get_socket_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Score relay listening on http://{}", addr);
        self.log_server_info();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Score relay stopped gracefully");
        Ok(())
    }

    pub fn app(&self) -> axum::Router {
        let state = Arc::new(AppState {
            service: self.service.clone(),
            chain: self.chain.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            request_timeout: self.server.request_timeout(),
        });
        create_app(state, &self.server)
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.server.host.parse::<std::net::IpAddr>()?,
            self.server.port,
        )))
    }

    fn log_server_info(&self) {
        info!("   Network: {} (chain id {})", self.chain.name, self.service.chain_id());
        info!("   Signer: {}", self.service.signer());
        info!("   Contract: {}", self.service.contract());
        info!("   CORS: {:?}", self.server.allowed_origins);
        info!("   Request timeout: {}s", self.server.request_timeout_secs);
        info!("   GET  /health");
        info!("   POST /api/submit-onchain");
    }
}

/// Router with the full middleware stack
pub fn create_app(state: Arc<AppState>, server: &ServerConfig) -> axum::Router {
    create_router(state)
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (answers preflight before any handler runs)
        .layer(create_cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Wait for shutdown signal
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}

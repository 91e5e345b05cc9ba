//! pwhash server implementation

use std::net::SocketAddr;
use std::sync::Arc;

use pwhash_core::{HashService, HasherConfig};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::routes::create_router;
use crate::state::{ServerState, SharedState};

/// Password hashing HTTP server
pub struct PwhashServer {
    state: SharedState,
    addr: SocketAddr,
}

impl PwhashServer {
    /// Run the server until ctrl-c
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state.clone());
        let params = self.state.service.parameters();

        tracing::info!(
            addr = %self.addr,
            %params,
            admin = self.state.admin,
            "Starting pwhash server"
        );

        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::error::ServerError::Internal(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server state for testing
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Builder for PwhashServer
pub struct ServerBuilder {
    config: HasherConfig,
    addr: SocketAddr,
    admin: bool,
    metrics: bool,
}

impl ServerBuilder {
    pub fn new(config: HasherConfig) -> Self {
        Self {
            config,
            addr: ([127, 0, 0, 1], 8080).into(),
            admin: false,
            metrics: false,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.addr = ([0, 0, 0, 0], port).into();
        self
    }

    /// Serve the parameter rotation routes
    pub fn admin(mut self, enabled: bool) -> Self {
        self.admin = enabled;
        self
    }

    /// Install a Prometheus recorder and serve `/metrics`
    pub fn metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }

    pub fn build(self) -> Result<PwhashServer> {
        let service = HashService::from_config(&self.config)?;
        let ceiling = self.config.ceiling();
        match &ceiling {
            Some(ceiling) => tracing::info!(?ceiling, "DOS protection enabled"),
            None => tracing::warn!(
                "No cost ceiling configured: /verify will run Argon2 with whatever memory a submitted hash claims; \
                 set --max-memory (and --max-time, --max-threads) to bound it"
            ),
        }

        let mut state = ServerState::new(service)
            .with_admin(self.admin)
            .with_ceiling(ceiling);
        if self.metrics {
            state = state.with_metrics(crate::metrics::init_prometheus_recorder()?);
        }
        crate::metrics::set_params(&state.service.parameters());

        Ok(PwhashServer {
            state: Arc::new(state),
            addr: self.addr,
        })
    }
}

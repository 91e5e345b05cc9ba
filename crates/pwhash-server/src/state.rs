//! Server state: the hash service plus process-level handles

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use pwhash_core::{CostCeiling, HashService, HasherConfig};

use crate::error::Result;

pub struct ServerState {
    /// Hash service; the only mutable part is its lock-free parameter store
    pub service: HashService,
    /// Whether the parameter rotation routes are served
    pub admin: bool,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
    /// Cost ceiling the service's DOS gate enforces; `None` means unbounded
    pub ceiling: Option<CostCeiling>,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(service: HashService) -> Self {
        Self {
            service,
            admin: false,
            metrics: None,
            ceiling: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_ceiling(mut self, ceiling: Option<CostCeiling>) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Shared server state type
pub type SharedState = Arc<ServerState>;

/// Create shared state from config
pub fn create_shared_state(config: &HasherConfig) -> Result<SharedState> {
    let service = HashService::from_config(config)?;
    crate::metrics::set_params(&service.parameters());
    Ok(Arc::new(ServerState::new(service).with_ceiling(config.ceiling())))
}

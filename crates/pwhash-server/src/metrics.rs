//! Prometheus metrics for the hash server
//!
//! Only operation and outcome labels; nothing derived from passwords,
//! peppers or hashes.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use pwhash_core::CostParameters;

use crate::error::{Result, ServerError};

pub const OP_HASH: &str = "hash";
pub const OP_VERIFY: &str = "verify";

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub fn record_request(op: &str, outcome: &str, duration: Duration) {
    counter!("pwhash_requests_total", "op" => op.to_string(), "outcome" => outcome.to_string()).increment(1);
    histogram!("pwhash_request_duration_seconds", "op" => op.to_string(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_verification(valid: bool, rehash: bool) {
    counter!("pwhash_verifications_total", "valid" => valid.to_string()).increment(1);
    if rehash {
        counter!("pwhash_rehash_signaled_total").increment(1);
    }
}

pub fn record_dos_rejection() {
    counter!("pwhash_dos_rejected_total").increment(1);
}

pub fn set_params(params: &CostParameters) {
    gauge!("pwhash_params_time").set(params.time() as f64);
    gauge!("pwhash_params_memory_kib").set(params.memory_kib() as f64);
    gauge!("pwhash_params_parallelism").set(params.parallelism() as f64);
}

pub fn record_params_rotation() {
    counter!("pwhash_params_rotations_total").increment(1);
}

/// In-flight gauge that decrements on drop, including when the request is
/// cancelled mid-KDF
pub struct InFlight {
    op: &'static str,
}

impl InFlight {
    pub fn start(op: &'static str) -> Self {
        gauge!("pwhash_requests_in_flight", "op" => op).increment(1.0);
        Self { op }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("pwhash_requests_in_flight", "op" => self.op).decrement(1.0);
    }
}

pub fn init_prometheus_recorder() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))
}

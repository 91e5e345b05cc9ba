//! End-to-end server integration tests
//!
//! Runs a real listener and talks to it through the HTTP client:
//! hash -> verify -> rotate -> verify again.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pwhash_client::PwhashClient;
use pwhash_core::{CostCeiling, CostParameters, ErrorKind, HashRecord, HashService, HasherConfig};
use pwhash_server::{create_router, create_shared_state, ServerState, SharedState};
use reqwest::Client;
use tokio::net::TcpListener;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19300);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

fn cheap_params() -> CostParameters {
    CostParameters::new(1, 64, 1).unwrap()
}

/// Test harness for running E2E server tests
pub struct TestHarness {
    pub server_url: String,
    pub state: SharedState,
    pub client: PwhashClient,
    pub http: Client,
    _shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHarness {
    /// Server with cheap parameters and admin routes enabled
    pub async fn new() -> Self {
        let service = HashService::new(cheap_params());
        Self::with_state(Arc::new(ServerState::new(service).with_admin(true))).await
    }

    pub async fn with_state(state: SharedState) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let port = next_port();
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let server_url = format!("http://127.0.0.1:{}", port);

        let router = create_router(state.clone());
        let listener = TcpListener::bind(addr).await.expect("Bind should succeed");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        for _ in 0..20 {
            if Client::new()
                .get(format!("{}/health", server_url))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Self {
            client: PwhashClient::new(server_url.clone()),
            server_url,
            state,
            http: Client::new(),
            _shutdown: Some(shutdown_tx),
        }
    }
}

#[tokio::test]
async fn test_health_reports_parameters() {
    let harness = TestHarness::new().await;

    let health = harness.client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.params, cheap_params());
    assert!(health.cost_ceiling.is_none());
    assert_eq!(harness.client.params().await.unwrap(), cheap_params());
}

#[tokio::test]
async fn test_hash_verify_and_rotate() {
    let harness = TestHarness::new().await;
    let client = harness.client.with_pepper(b"pepper");

    let hash = client.hash("password").await.unwrap();
    assert_eq!(PwhashClient::inspect(&hash).unwrap(), cheap_params());

    let v = client.verify("password", &hash).await.unwrap();
    assert!(v.valid);
    assert!(!v.rehash);

    let update = client.set_parameters(1, 128, 1).await.unwrap();
    assert_eq!(update.previous, cheap_params());
    assert_eq!(update.current.memory_kib(), 128);
    assert_eq!(harness.state.service.parameters().memory_kib(), 128);

    // old record still verifies under its own parameters, now flagged
    let v = client.verify("password", &hash).await.unwrap();
    assert!(v.valid);
    assert!(v.rehash);

    let rehashed = client.hash("password").await.unwrap();
    assert_eq!(PwhashClient::inspect(&rehashed).unwrap().memory_kib(), 128);
    let v = client.verify("password", &rehashed).await.unwrap();
    assert!(v.valid);
    assert!(!v.rehash);
}

#[tokio::test]
async fn test_wrong_password_never_signals_rehash() {
    let harness = TestHarness::new().await;
    let client = harness.client.with_pepper(b"pepper");

    let hash = client.hash("password").await.unwrap();
    client.set_parameters(1, 256, 1).await.unwrap();

    let v = client.verify("Password", &hash).await.unwrap();
    assert!(!v.valid);
    assert!(!v.rehash);

    // pepper is part of the secret
    let v = harness.client.verify("password", &hash).await.unwrap();
    assert!(!v.valid);
    assert!(!v.rehash);
}

#[tokio::test]
async fn test_associated_data_binds_hash() {
    let harness = TestHarness::new().await;
    let alice = harness.client.with_pepper(b"pepper").with_associated_data(b"alice");
    let bob = harness.client.with_pepper(b"pepper").with_associated_data(b"bob");

    let hash = alice.hash("password").await.unwrap();
    assert!(alice.verify("password", &hash).await.unwrap().valid);

    // same password and pepper, different context
    let v = bob.verify("password", &hash).await.unwrap();
    assert!(!v.valid);
    assert!(!v.rehash);
    assert!(!harness.client.with_pepper(b"pepper").verify("password", &hash).await.unwrap().valid);

    let err = harness
        .client
        .with_associated_data([0u8; 33])
        .hash("password")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_dos_gate_rejects_before_kdf() {
    let service = HashService::new(cheap_params()).with_dos_gate(CostCeiling {
        max_memory_kib: Some(64),
        ..CostCeiling::default()
    });
    let harness = TestHarness::with_state(Arc::new(ServerState::new(service))).await;

    // a record claiming 1 GiB; the gate must answer before any derivation
    let expensive = HashRecord::new(CostParameters::new(1, 1 << 20, 1).unwrap(), [7; 16], [9; 16]);
    let err = harness
        .client
        .verify("password", &expensive.encode())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ResourceExhausted));

    // records inside the ceiling still verify
    let hash = harness.client.hash("password").await.unwrap();
    let v = harness.client.verify("password", &hash).await.unwrap();
    assert!(v.valid);
    assert!(!v.rehash);
}

#[tokio::test]
async fn test_malformed_hash_is_invalid_argument() {
    let harness = TestHarness::new().await;

    for bad in [&[][..], &[0x01, 0x02][..], &[0x24; 10][..]] {
        let err = harness.client.verify("password", bad).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument), "input {:02x?}", bad);
    }

    // valid header with a truncated body
    let mut hash = harness.client.hash("password").await.unwrap();
    hash.truncate(hash.len() - 1);
    let err = harness.client.verify("password", &hash).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_admin_routes_disabled_by_default() {
    let state = create_shared_state(&HasherConfig {
        time: 1,
        memory_kib: 64,
        parallelism: 1,
        ..HasherConfig::default()
    })
    .unwrap();
    let harness = TestHarness::with_state(state).await;

    let err = harness.client.set_parameters(1, 128, 1).await.unwrap_err();
    assert!(matches!(err, pwhash_client::ClientError::Server { status: 404, .. }));
    assert_eq!(harness.state.service.parameters(), cheap_params());
}

#[tokio::test]
async fn test_hash_response_is_not_compressed() {
    let harness = TestHarness::new().await;

    let resp = harness
        .http
        .post(format!("{}/hash", harness.server_url))
        .header("accept-encoding", "gzip")
        .json(&serde_json::json!({ "password": "password", "pepper": hex::encode("pepper") }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert!(resp.headers().get("content-encoding").is_none());
    assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");
}

#[tokio::test]
async fn test_concurrent_clients_during_rotation() {
    let harness = TestHarness::new().await;
    let mut handles = vec![];

    for i in 0..8 {
        let client = harness.client.clone();
        handles.push(tokio::spawn(async move {
            let password = format!("user-{}", i);
            let hash = client.hash(&password).await.unwrap();
            let v = client.verify(&password, &hash).await.unwrap();
            assert!(v.valid);
        }));
    }

    for memory in [128, 64, 128] {
        harness.client.set_parameters(1, memory, 1).await.unwrap();
    }

    for h in handles {
        h.await.unwrap();
    }
}

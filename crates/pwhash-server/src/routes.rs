//! HTTP routes for the hash server

use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use pwhash_core::{CostCeiling, CostParameters, HashRecord};
use serde::{Deserialize, Serialize};
use tower_http::compression::{predicate::DefaultPredicate, CompressionLayer, Predicate};
use zeroize::Zeroizing;

use crate::error::{Result, ServerError};
use crate::metrics;
use crate::state::SharedState;

/// Request bodies above this size are refused
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Hash request
#[derive(Deserialize)]
pub struct HashRequest {
    pub password: String,
    /// Hex-encoded pepper
    #[serde(default)]
    pub pepper: Option<String>,
    /// Hex-encoded associated data, at most 32 bytes
    #[serde(default)]
    pub associated_data: Option<String>,
}

/// Hash response
#[derive(Serialize)]
pub struct HashResponse {
    /// Hex-encoded hash record
    pub hash: String,
}

/// Verify request
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub password: String,
    /// Hex-encoded pepper
    #[serde(default)]
    pub pepper: Option<String>,
    /// Hex-encoded associated data given when hashing
    #[serde(default)]
    pub associated_data: Option<String>,
    /// Hex-encoded hash record
    pub hash: String,
}

/// Verify response
#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub rehash: bool,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub params: CostParameters,
    /// `null` when verification cost is unbounded
    pub cost_ceiling: Option<CostCeiling>,
    pub uptime_secs: u64,
}

/// Admin parameter rotation request
#[derive(Deserialize)]
pub struct SetParamsRequest {
    pub time: u32,
    pub memory_kib: u32,
    pub parallelism: u8,
}

/// Admin parameter rotation response
#[derive(Serialize)]
pub struct ParamsUpdate {
    pub previous: CostParameters,
    pub current: CostParameters,
}

/// Response marker: never compress this response
#[derive(Debug, Clone, Copy)]
pub struct Sensitive;

/// Compression predicate skipping responses marked [`Sensitive`]
#[derive(Debug, Clone, Copy)]
pub struct NotSensitive;

impl Predicate for NotSensitive {
    fn should_compress<B>(&self, response: &axum::http::Response<B>) -> bool
    where
        B: HttpBody,
    {
        response.extensions().get::<Sensitive>().is_none()
    }
}

/// Per-call compression opt-out for the password routes
///
/// Compressed sizes of responses derived from secrets form a length oracle,
/// so these routes refuse compressed request bodies and mark their responses
/// so the compression layer passes them through untouched.
async fn sensitive(req: Request, next: Next) -> Response {
    let encoded = req
        .headers()
        .get(header::CONTENT_ENCODING)
        .filter(|v| !v.as_bytes().eq_ignore_ascii_case(b"identity"))
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let mut response = match encoded {
        Some(encoding) => ServerError::UnsupportedEncoding(encoding).into_response(),
        None => next.run(req).await,
    };

    response.extensions_mut().insert(Sensitive);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Time a whole password request, from body parsing to response, and record
/// its outcome
async fn instrumented<T, Fut>(op: &'static str, request: Fut) -> Result<T>
where
    Fut: std::future::Future<Output = Result<T>>,
{
    let _in_flight = metrics::InFlight::start(op);
    let started = Instant::now();

    let result = request.await;

    let outcome = match &result {
        Ok(_) => metrics::OUTCOME_OK,
        Err(e) if e.status() == StatusCode::TOO_MANY_REQUESTS => metrics::OUTCOME_REJECTED,
        Err(e) if e.status().is_client_error() => metrics::OUTCOME_CLIENT_ERROR,
        Err(_) => metrics::OUTCOME_SERVER_ERROR,
    };
    metrics::record_request(op, outcome, started.elapsed());

    result
}

/// Run KDF work off the async executor
///
/// If the request is dropped while the KDF runs, the worker finishes and its
/// result is discarded.
async fn run_blocking<T, F>(op: &'static str, work: F) -> Result<T>
where
    F: FnOnce() -> pwhash_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(ServerError::from),
        Err(e) => Err(ServerError::Internal(format!("{} worker failed: {}", op, e))),
    }
}

/// Decode an optional hex field, wiping the decoded bytes on drop
fn decode_hex_field(field: &str, value: Option<&str>) -> Result<Zeroizing<Vec<u8>>> {
    match value {
        None => Ok(Zeroizing::new(Vec::new())),
        Some(hex) => hex::decode(hex)
            .map(Zeroizing::new)
            .map_err(|e| ServerError::InvalidRequest(format!("{} is not hex: {}", field, e))),
    }
}

/// Hash a password under the current parameters
async fn hash(
    State(state): State<SharedState>,
    req: std::result::Result<Json<HashRequest>, JsonRejection>,
) -> Result<Json<HashResponse>> {
    instrumented(metrics::OP_HASH, async move {
        let Json(req) = req?;
        let pepper = decode_hex_field("pepper", req.pepper.as_deref())?;
        let associated_data = decode_hex_field("associated_data", req.associated_data.as_deref())?;
        let password = Zeroizing::new(req.password);

        let record = run_blocking(metrics::OP_HASH, move || {
            state
                .service
                .hash_with_data(password.as_bytes(), &pepper, &associated_data)
        })
        .await?;

        Ok::<_, ServerError>(Json(HashResponse {
            hash: record.to_hex(),
        }))
    })
    .await
}

/// Verify a password against a hash record
async fn verify(
    State(state): State<SharedState>,
    req: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>> {
    let result = instrumented(metrics::OP_VERIFY, async move {
        let Json(req) = req?;
        let pepper = decode_hex_field("pepper", req.pepper.as_deref())?;
        let associated_data = decode_hex_field("associated_data", req.associated_data.as_deref())?;
        let record = HashRecord::from_hex(&req.hash).map_err(pwhash_core::Error::from)?;
        let password = Zeroizing::new(req.password);

        run_blocking(metrics::OP_VERIFY, move || {
            state
                .service
                .verify_record(password.as_bytes(), &pepper, &associated_data, &record)
        })
        .await
    })
    .await;

    if let Err(ServerError::Hasher(pwhash_core::Error::CostRejected(_))) = &result {
        metrics::record_dos_rejection();
    }
    let verification = result?;
    metrics::record_verification(verification.valid, verification.rehash);

    Ok(Json(VerifyResponse {
        valid: verification.valid,
        rehash: verification.rehash,
    }))
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        params: state.service.parameters(),
        cost_ceiling: state.ceiling,
        uptime_secs: state.uptime_secs(),
    })
}

/// Current cost parameters
async fn params(State(state): State<SharedState>) -> Json<CostParameters> {
    Json(state.service.parameters())
}

/// Rotate cost parameters
async fn set_params(
    State(state): State<SharedState>,
    req: std::result::Result<Json<SetParamsRequest>, JsonRejection>,
) -> Result<Json<ParamsUpdate>> {
    let Json(req) = req?;
    let current = CostParameters::new(req.time, req.memory_kib, req.parallelism)?;
    let previous = state.service.replace_parameters(current);

    metrics::set_params(&current);
    metrics::record_params_rotation();

    Ok(Json(ParamsUpdate { previous, current }))
}

/// Prometheus scrape endpoint
async fn prometheus(State(state): State<SharedState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let mut router: Router<SharedState> = Router::new()
        .route("/hash", post(hash))
        .route("/verify", post(verify))
        .route_layer(middleware::from_fn(sensitive))
        .route("/health", get(health))
        .route("/params", get(params))
        .route("/metrics", get(prometheus));

    if state.admin {
        router = router.route("/admin/params", put(set_params));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new().compress_when(DefaultPredicate::new().and(NotSensitive)))
        .with_state(state)
}

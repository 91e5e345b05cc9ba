//! pwhash HTTP client implementation

use std::fmt;

use pwhash_core::{CostCeiling, CostParameters, HashRecord};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{ClientError, Result};

#[derive(Serialize)]
struct HashRequest<'a> {
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    associated_data: Option<String>,
}

#[derive(Deserialize)]
struct HashResponse {
    hash: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    associated_data: Option<String>,
    hash: String,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
    rehash: bool,
}

#[derive(Serialize)]
struct SetParamsRequest {
    time: u32,
    memory_kib: u32,
    parallelism: u8,
}

/// Response from the admin parameter endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ParamsUpdate {
    pub previous: CostParameters,
    pub current: CostParameters,
}

/// Response from the health endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub params: CostParameters,
    /// `None` when the server verifies hashes of any cost
    #[serde(default)]
    pub cost_ceiling: Option<CostCeiling>,
}

/// Result of a password verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub rehash: bool,
}

/// Client for a pwhash server
#[derive(Clone)]
pub struct PwhashClient {
    http: Client,
    server_url: String,
    pepper: Option<Zeroizing<Vec<u8>>>,
    associated_data: Option<Vec<u8>>,
}

impl PwhashClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_url)
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, TLS)
    pub fn with_http(http: Client, server_url: impl Into<String>) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            pepper: None,
            associated_data: None,
        }
    }

    /// Copy of this client that sends `pepper` with every call
    pub fn with_pepper(&self, pepper: impl AsRef<[u8]>) -> Self {
        let mut client = self.clone();
        client.pepper = Some(Zeroizing::new(pepper.as_ref().to_vec()));
        client
    }

    /// Copy of this client that binds every hash to `associated_data`
    ///
    /// Hashes made this way only verify through a client carrying the same
    /// data. The server accepts at most 32 bytes.
    pub fn with_associated_data(&self, associated_data: impl AsRef<[u8]>) -> Self {
        let mut client = self.clone();
        client.associated_data = Some(associated_data.as_ref().to_vec());
        client
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Hash a password, returning the raw record bytes
    pub async fn hash(&self, password: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(format!("{}/hash", self.server_url))
            .json(&HashRequest {
                password,
                pepper: self.pepper_hex(),
                associated_data: self.associated_data_hex(),
            })
            .send()
            .await?;

        let body: HashResponse = check(resp).await?.json().await?;
        hex::decode(&body.hash).map_err(|e| ClientError::InvalidResponse(format!("hash is not hex: {}", e)))
    }

    /// Verify a password against record bytes returned by [`hash`](Self::hash)
    pub async fn verify(&self, password: &str, hash: &[u8]) -> Result<Verification> {
        let resp = self
            .http
            .post(format!("{}/verify", self.server_url))
            .json(&VerifyRequest {
                password,
                pepper: self.pepper_hex(),
                associated_data: self.associated_data_hex(),
                hash: hex::encode(hash),
            })
            .send()
            .await?;

        let body: VerifyResponse = check(resp).await?.json().await?;
        if body.rehash && !body.valid {
            tracing::warn!("Server signaled rehash for an invalid password; ignoring");
        }

        Ok(Verification {
            valid: body.valid,
            rehash: body.valid && body.rehash,
        })
    }

    /// Decode the cost parameters embedded in a record without contacting the server
    pub fn inspect(hash: &[u8]) -> Result<CostParameters> {
        HashRecord::decode(hash)
            .map(|record| *record.params())
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Parameters the server currently issues hashes with
    pub async fn params(&self) -> Result<CostParameters> {
        let resp = self
            .http
            .get(format!("{}/params", self.server_url))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Rotate the server's cost parameters (requires the admin routes)
    pub async fn set_parameters(&self, time: u32, memory_kib: u32, parallelism: u8) -> Result<ParamsUpdate> {
        let resp = self
            .http
            .put(format!("{}/admin/params", self.server_url))
            .json(&SetParamsRequest {
                time,
                memory_kib,
                parallelism,
            })
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self
            .http
            .get(format!("{}/health", self.server_url))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    fn pepper_hex(&self) -> Option<String> {
        self.pepper.as_ref().map(|p| hex::encode(p.as_slice()))
    }

    fn associated_data_hex(&self) -> Option<String> {
        self.associated_data.as_ref().map(hex::encode)
    }
}

impl fmt::Debug for PwhashClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PwhashClient")
            .field("server_url", &self.server_url)
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .field("associated_data", &self.associated_data_hex())
            .finish()
    }
}

async fn check(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    Err(ClientError::Server {
        status: resp.status().as_u16(),
        message: resp.text().await.unwrap_or_default(),
    })
}

//! pwhash-client: HTTP client for the pwhash service
//!
//! Wraps the `/hash` and `/verify` endpoints. A client can be bound to a
//! pepper once with [`PwhashClient::with_pepper`] so call sites never handle
//! it directly. The client re-applies the rehash mask on every verification,
//! so a `rehash = true` answer always comes with `valid = true` even when
//! talking to a misbehaving server.

pub mod client;
pub mod error;

pub use client::{HealthResponse, ParamsUpdate, PwhashClient, Verification};
pub use error::{ClientError, Result};

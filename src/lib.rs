//! pwhash: Argon2id password hashing with self-describing records
//!
//! Facade over the workspace crates:
//! - [`hashing`]: record format, hash/verify, parameter rotation
//! - [`server`]: HTTP service
//! - [`client`]: HTTP client

pub use pwhash_client as client;
pub use pwhash_core as hashing;
pub use pwhash_server as server;

//! pwhash-core: Self-describing Argon2id password hashes
//!
//! This crate holds everything the service does apart from the transport:
//! - the cost-parameter codec that prefixes every issued hash
//! - the hash record (`prefix || salt || tag`)
//! - the lock-free parameter store used for live cost rotation
//! - the Hash/Verify protocol with rehash signaling and DOS gating
//!
//! # Record Format
//!
//! ```text
//! +-----------------+-----------+-----------+
//! | prefix (2..12B) | salt (16) | tag (16)  |
//! +-----------------+-----------+-----------+
//! ```
//!
//! The prefix carries a unary version tag in the low bits of its first byte
//! followed by the version-specific encoding of `(time, memory, parallelism)`.
//! Decoding the prefix alone tells the verifier how to recompute the tag.
//!
//! # Threat Model
//!
//! | Input | Trust |
//! |-------|-------|
//! | password, pepper | caller-supplied, never logged |
//! | associated data | caller-supplied, bound into the tag, at most 32 bytes |
//! | hash record on verify | **untrusted** - decoded defensively, gated before KDF work |
//! | cost parameters | operator-supplied, validated on every change |
//!
//! A wrong password is a normal `valid = false` result. The `rehash` flag is
//! only ever raised alongside `valid = true`.

mod codec;
mod config;
mod error;
mod kdf;
mod params;
mod policy;
mod record;
mod service;
mod store;

pub use codec::{decode_params, encode_params, DecodeError, FormatVersion, MAX_PREFIX_LEN};
pub use config::HasherConfig;
pub use error::{Error, ErrorKind};
pub use kdf::{Argon2id, Kdf, KdfError, MAX_ASSOCIATED_DATA_LEN};
pub use params::{ConfigError, CostParameters};
pub use policy::{AllowAll, AnyCostIncreased, CostCeiling, DosGate, MemoryIncreased, NeverRehash, RehashPolicy};
pub use record::{HashRecord, Salt, Tag, SALT_LEN, TAG_LEN};
pub use service::{HashService, Verification};
pub use store::ParameterStore;

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for pwhash-core

use thiserror::Error;

use crate::codec::DecodeError;
use crate::kdf::KdfError;
use crate::params::{ConfigError, CostParameters};

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidRecord(#[from] DecodeError),

    #[error("invalid hash: cost parameters {params} are unusable: {reason}")]
    UnusableParameters {
        params: CostParameters,
        reason: String,
    },

    #[error("associated data is {0} bytes, at most 32 are accepted")]
    AssociatedDataTooLong(usize),

    #[error("hash cost {0} exceeds the configured limits")]
    CostRejected(CostParameters),

    #[error("random source failure: {0}")]
    Entropy(String),

    #[error("key derivation failed: {0}")]
    Kdf(KdfError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport-neutral error class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    ResourceExhausted,
    Internal,
    Configuration,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRecord(_) | Error::UnusableParameters { .. } | Error::AssociatedDataTooLong(_) => {
                ErrorKind::InvalidArgument
            }
            Error::CostRejected(_) => ErrorKind::ResourceExhausted,
            Error::Entropy(_) | Error::Kdf(_) | Error::Io(_) => ErrorKind::Internal,
            Error::Config(_) | Error::Json(_) => ErrorKind::Configuration,
        }
    }
}

//! Client error types

use pwhash_core::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Error class reported by the server, if the failure came from it
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Server { status, .. } => match status {
                400 | 415 => Some(ErrorKind::InvalidArgument),
                429 => Some(ErrorKind::ResourceExhausted),
                500..=599 => Some(ErrorKind::Internal),
                _ => None,
            },
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

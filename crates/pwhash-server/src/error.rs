//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pwhash_core::{ConfigError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Hasher(#[from] pwhash_core::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("Compressed requests are not accepted: {0}")]
    UnsupportedEncoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Hasher(e) => match e.kind() {
                ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                ErrorKind::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::Configuration => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Config(_) => StatusCode::BAD_REQUEST,
            ServerError::UnsupportedEncoding(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for ServerError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        ServerError::InvalidRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pwhash_core::{CostParameters, DecodeError};

    #[test]
    fn test_status_mapping() {
        let invalid = ServerError::from(pwhash_core::Error::InvalidRecord(DecodeError::Empty));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let params = CostParameters::new(1, 1 << 30, 1).unwrap();
        let rejected = ServerError::from(pwhash_core::Error::CostRejected(params));
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

        let entropy = ServerError::from(pwhash_core::Error::Entropy("gone".into()));
        assert_eq!(entropy.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let config = ServerError::from(ConfigError::InvalidTime(0));
        assert_eq!(config.status(), StatusCode::BAD_REQUEST);
    }
}

//! Error types for the transaction producer
//!
//! Configuration problems are fatal and surface at construction time.
//! Delivery problems are absorbed by the delivery client and only show up
//! in its metrics; the stream-provisioning path is the one place where a
//! service error reaches the caller.

use thiserror::Error;

/// Errors raised by the log service boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The stream does not exist (yet).
    #[error("Stream not found: {0}")]
    ResourceNotFound(String),

    /// The stream is already being created or is otherwise busy.
    #[error("Resource in use: {0}")]
    ResourceInUse(String),

    /// Any other error code reported by the service.
    #[error("Service error {code}: {message}")]
    Api { code: String, message: String },

    /// The request could not be completed at all.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A request or response body could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl ServiceError {
    /// Map a service error code to its typed variant.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "ResourceNotFoundException" => ServiceError::ResourceNotFound(message),
            "ResourceInUseException" => ServiceError::ResourceInUse(message),
            _ => ServiceError::Api {
                code: code.to_string(),
                message,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::ResourceNotFound(_))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

/// Main error type for the producer library
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Invalid configuration, detected before any work is done
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error returned by the log service
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The stream did not report ACTIVE within the polling budget
    #[error("Stream {stream} did not become active after {attempts} attempts")]
    StreamNotReady { stream: String, attempts: u32 },

    /// A record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProducerError>;

/// Error handling for the ACME client
use crate::problem::Problem;
use std::time::Duration;
use thiserror::Error;

/// Result type for ACME operations
pub type Result<T> = std::result::Result<T, AcmeError>;

/// Error types surfaced to callers
#[derive(Error, Debug)]
pub enum AcmeError {
    /// Network or TLS failure; retriable at the caller's discretion
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed response or missing required header; not retriable
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// badNonce persisted past the internal retry budget
    #[error("Nonce rejected after {attempts} retries: {problem}")]
    RetriableNonce { attempts: u32, problem: Problem },

    /// Server rejected the request as unauthorized
    #[error("Unauthorized: {0}")]
    Unauthorized(Problem),

    /// Terms of service changed; the user must re-accept
    #[error("User action required: {problem}")]
    UserActionRequired {
        /// Terms-of-service URL from the `Link` header, if present
        tos_url: Option<String>,
        problem: Problem,
    },

    /// Rate limited by the server
    #[error("Rate limited, retry after {retry_after:?}: {problem}")]
    RateLimited {
        retry_after: Option<Duration>,
        /// `Link: rel="rate-limit"` documentation URLs
        links: Vec<String>,
        problem: Problem,
    },

    /// No account is registered for the key (`onlyReturnExisting`)
    #[error("Account does not exist: {0}")]
    AccountNotFound(Problem),

    /// Any other ACME problem document
    #[error("Server reported a problem: {0}")]
    Server(Problem),

    /// Caller-initiated cancellation
    #[error("Operation cancelled")]
    Cancelled,

    /// Polling exceeded the overall timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Directory lacks the requested endpoint
    #[error("Feature not supported by this CA: {0}")]
    FeatureNotSupported(String),

    /// Cryptographic operation error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation attempted in the wrong resource state
    #[error("Invalid state: {resource} is {status}")]
    InvalidState { resource: String, status: String },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    Pem(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcmeError {
    /// Create a network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        AcmeError::Network(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        AcmeError::Protocol(msg.into())
    }

    /// Create a crypto error
    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        AcmeError::Crypto(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        AcmeError::InvalidInput(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(resource: S, status: S) -> Self {
        AcmeError::InvalidState {
            resource: resource.into(),
            status: status.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        AcmeError::Timeout(msg.into())
    }

    /// Create a feature-not-supported error
    pub fn feature_not_supported<S: Into<String>>(feature: S) -> Self {
        AcmeError::FeatureNotSupported(feature.into())
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        AcmeError::Configuration(msg.into())
    }

    /// Create a PEM error
    pub fn pem<S: Into<String>>(msg: S) -> Self {
        AcmeError::Pem(msg.into())
    }

    /// The problem document attached to this error, if any
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            AcmeError::RetriableNonce { problem, .. }
            | AcmeError::Unauthorized(problem)
            | AcmeError::UserActionRequired { problem, .. }
            | AcmeError::RateLimited { problem, .. }
            | AcmeError::AccountNotFound(problem)
            | AcmeError::Server(problem) => Some(problem),
            _ => None,
        }
    }
}

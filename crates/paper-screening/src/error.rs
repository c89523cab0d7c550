//! Error types for the screening pipeline.
//!
//! Uses `thiserror` for structured error handling. `ClientError` covers the HTTP
//! layer; `PipelineError` is the component-level taxonomy every recoverable
//! condition is classified into before it is absorbed (or surfaced as a [`Failure`]).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::SourceId;

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the upstream API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Credential rejected (401/403 response)
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited {
            retry_after: Duration::from_secs(seconds),
        }
    }

    /// Create an unauthorized error.
    #[must_use]
    pub fn unauthorized(status: u16, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            status,
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_) | Self::Server { .. })
    }

    /// Returns true if the upstream rejected the credential.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Classification of every failure the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Network or non-2xx response from a source backend.
    SourceUnavailable,
    /// Malformed upstream payload.
    ParseFailure,
    /// Missing or badly-formatted AI credential.
    ProviderAuthInvalid,
    /// Network or HTTP error calling the AI provider.
    ProviderCallFailure,
    /// AI text that is neither JSON nor heuristically parseable.
    ResponseUnparsable,
    /// Persistence read/write error.
    StorageFailure,
    /// Every enabled source was tried and none produced a record.
    NoResults,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SourceUnavailable => "source unavailable",
            Self::ParseFailure => "parse failure",
            Self::ProviderAuthInvalid => "provider credential invalid",
            Self::ProviderCallFailure => "provider call failed",
            Self::ResponseUnparsable => "response unparsable",
            Self::StorageFailure => "storage failure",
            Self::NoResults => "no results",
        };
        f.write_str(label)
    }
}

/// Component-level errors, one variant per [`ErrorKind`].
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A source backend could not be reached or answered non-2xx.
    #[error("{source_id} unavailable: {message}")]
    SourceUnavailable {
        /// Which backend failed
        source_id: SourceId,
        /// Human-readable cause
        message: String,
    },

    /// An upstream payload could not be decoded.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// The AI credential failed its format check or was rejected.
    #[error("Provider credential invalid: {0}")]
    ProviderAuthInvalid(String),

    /// The AI provider call failed at the transport or HTTP level.
    #[error("Provider call failed: {0}")]
    ProviderCallFailure(String),

    /// The AI provider answered with text nothing could be extracted from.
    #[error("Response unparsable: {0}")]
    ResponseUnparsable(String),

    /// The persisted store could not be read or written.
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl PipelineError {
    /// Create a source-unavailable error.
    #[must_use]
    pub fn source_unavailable(source_id: SourceId, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id,
            message: message.into(),
        }
    }

    /// Create a parse failure.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseFailure(message.into())
    }

    /// Create a storage failure.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageFailure(message.into())
    }

    /// The taxonomy entry this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::ParseFailure(_) => ErrorKind::ParseFailure,
            Self::ProviderAuthInvalid(_) => ErrorKind::ProviderAuthInvalid,
            Self::ProviderCallFailure(_) => ErrorKind::ProviderCallFailure,
            Self::ResponseUnparsable(_) => ErrorKind::ResponseUnparsable,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
        }
    }

    /// Wrap an HTTP error raised while talking to a source backend.
    ///
    /// Body decoding errors are parse failures; everything else means the
    /// backend is unavailable.
    #[must_use]
    pub fn from_source(source_id: SourceId, err: ClientError) -> Self {
        match err {
            ClientError::Parse(e) => Self::ParseFailure(e.to_string()),
            other => Self::source_unavailable(source_id, other.to_string()),
        }
    }

    /// Wrap an HTTP error raised while calling an AI provider.
    #[must_use]
    pub fn from_provider(err: ClientError) -> Self {
        if err.is_auth_failure() {
            Self::ProviderAuthInvalid(err.to_string())
        } else {
            Self::ProviderCallFailure(err.to_string())
        }
    }

    /// Convert into the structured value handed to callers.
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        Failure::new(self.kind(), self.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

/// A failure surfaced to the caller as data rather than as a panic or `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Originating condition.
    pub kind: ErrorKind,
    /// Human-readable explanation.
    pub message: String,
}

impl Failure {
    /// Create a failure value.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<PipelineError> for Failure {
    fn from(err: PipelineError) -> Self {
        err.to_failure()
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

//! # Error Taxonomy
//!
//! Every failure produced by the core crosses its public boundary as exactly one [`ProxyError`].
//!
//! Each variant maps to a stable, machine-checkable [`ErrorCode`], an HTTP status code and a
//! serializable [`ErrorBody`], so callers never need to inspect error text to decide how to
//! handle a failure.
//!
//! | Variant | HTTP status |
//! |---|---|
//! | `ServiceNotFound` | `404 Not Found` |
//! | `MethodNotFound` | `404 Not Found` |
//! | `MessageTypeMismatch` | `400 Bad Request` |
//! | `UpstreamConnFailure` | `502 Bad Gateway` |
//! | `Unknown` | `500 Internal Server Error` |
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tonic::Code;

/// The closed set of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    ServiceNotFound,
    MethodNotFound,
    MessageTypeMismatch,
    UpstreamConnFailure,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ServiceNotFound => "ServiceNotFound",
            ErrorCode::MethodNotFound => "MethodNotFound",
            ErrorCode::MessageTypeMismatch => "MessageTypeMismatch",
            ErrorCode::UpstreamConnFailure => "UpstreamConnFailure",
            ErrorCode::Unknown => "Unknown",
        }
    }

    /// The transport status used to report this kind of failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ServiceNotFound | ErrorCode::MethodNotFound => StatusCode::NOT_FOUND,
            ErrorCode::MessageTypeMismatch => StatusCode::BAD_REQUEST,
            ErrorCode::UpstreamConnFailure => StatusCode::BAD_GATEWAY,
            ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only error type returned by the public operations of [`crate::proxy::Proxy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    ServiceNotFound(String),
    #[error("{0}")]
    MethodNotFound(String),
    #[error("{0}")]
    MessageTypeMismatch(String),
    #[error("{0}")]
    UpstreamConnFailure(String),
    #[error("{0}")]
    Unknown(String),
}

/// The JSON document written for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ProxyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProxyError::ServiceNotFound(_) => ErrorCode::ServiceNotFound,
            ProxyError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            ProxyError::MessageTypeMismatch(_) => ErrorCode::MessageTypeMismatch,
            ProxyError::UpstreamConnFailure(_) => ErrorCode::UpstreamConnFailure,
            ProxyError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProxyError::ServiceNotFound(m)
            | ProxyError::MethodNotFound(m)
            | ProxyError::MessageTypeMismatch(m)
            | ProxyError::UpstreamConnFailure(m)
            | ProxyError::Unknown(m) => m,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.code().status_code()
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.message().to_string(),
        }
    }

    /// Serializes the error as its JSON [`ErrorBody`].
    pub fn to_json(&self) -> Vec<u8> {
        // A struct of two strings always serializes.
        serde_json::to_vec(&self.body()).unwrap_or_default()
    }

    /// Wraps a gRPC status returned by the upstream.
    ///
    /// Statuses that mean the upstream could not be reached (or the call ran out of time)
    /// become `UpstreamConnFailure`, everything else the upstream answered with is `Unknown`.
    pub fn from_upstream_status(status: &tonic::Status) -> Self {
        let message = format!(
            "upstream call failed: code={:?} message={:?}",
            status.code(),
            status.message()
        );

        if is_connectivity_failure(status.code()) {
            ProxyError::UpstreamConnFailure(message)
        } else {
            ProxyError::Unknown(message)
        }
    }
}

/// Whether a gRPC code reports a transport level failure rather than an answer from the upstream.
pub(crate) fn is_connectivity_failure(code: Code) -> bool {
    matches!(
        code,
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled
    )
}

// for error definitions
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Admission rejected by the concurrency or per-minute limit
    #[error("Endpoint overloaded: {0}")]
    Overloaded(String),

    /// The endpoint was not healthy when the call was dispatched
    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),

    /// A single attempt exceeded its deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint answered with an error or an invalid payload
    #[error("Remote error: {0}")]
    Remote(RemoteError),

    /// A call arrived after shutdown began
    #[error("Client is shutting down")]
    ShuttingDown,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response cache errors (never fatal for a call)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures reported by the remote endpoint
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport-level failure (connect, reset, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status code
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response did not match the chat-completion schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Tag identifying the kind of failure, for callers deciding how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Overloaded,
    Unavailable,
    Timeout,
    RemoteError,
    ShuttingDown,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Overloaded => "overloaded",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RemoteError => "remote_error",
            ErrorKind::ShuttingDown => "shutting_down",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Overloaded(_) => ErrorKind::Overloaded,
            ClientError::Unavailable(_) => ErrorKind::Unavailable,
            ClientError::Timeout(_) => ErrorKind::Timeout,
            ClientError::Remote(_) => ErrorKind::RemoteError,
            ClientError::ShuttingDown => ErrorKind::ShuttingDown,
            ClientError::Config(_) | ClientError::Cache(_) | ClientError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True for failures the caller should retry later rather than report
    pub fn is_backoff(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Overloaded | ErrorKind::Unavailable
        )
    }
}

impl From<RemoteError> for ClientError {
    fn from(err: RemoteError) -> Self {
        ClientError::Remote(err)
    }
}

// reqwest timeouts are reported as Timeout, everything else as a transport failure
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ClientError::Timeout(Duration::ZERO);
        }
        if err.is_decode() {
            return ClientError::Remote(RemoteError::InvalidResponse(err.to_string()));
        }
        match err.status() {
            Some(status) => ClientError::Remote(RemoteError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }),
            None => ClientError::Remote(RemoteError::Http(err.to_string())),
        }
    }
}

// implement conversions from serde_json::Error to ClientError
impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Remote(RemoteError::InvalidResponse(err.to_string()))
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, ClientError>;

//! Error handling for scheduler client operations.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::xdr::MarshalError;

/// Result type for client operations.
pub type LavaResult<T> = Result<T, LavaError>;

/// Outcome kind of a scheduler call.
///
/// This is what the session's last-result register holds. `NoError` and
/// `Eof` are not failures; every other kind is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ErrorKind {
    /// The call completed successfully.
    #[default]
    NoError,
    /// Unknown job, host, queue or user.
    NotFound,
    /// A cursor or log stream is exhausted.
    Eof,
    /// A single log line could not be parsed and was skipped.
    EventFormat,
    /// The master is unreachable or the transport is broken.
    ConnectionError,
    /// The master did not answer within the configured timeout.
    ConnectionTimeout,
    /// The request was invalid, or a reply could not be decoded.
    BadRequest,
    /// The master refused the request for the calling user.
    PermissionDenied,
    /// The master reported a code this client does not know.
    Unknown,
}

impl ErrorKind {
    /// Whether this kind represents a failed call.
    pub fn is_failure(self) -> bool {
        !matches!(self, ErrorKind::NoError | ErrorKind::Eof)
    }

    /// Symbolic name, as printed by the CLI.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::NoError => "NO_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Eof => "EOF",
            ErrorKind::EventFormat => "EVENT_FORMAT",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while talking to the scheduler master or reading
/// its logs.
#[derive(Error, Debug)]
pub enum LavaError {
    /// Job, host, queue or user not known to the master.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client-side validation failed before anything was sent.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The master refused the request.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Transport failure while reaching the master.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The session's transport broke earlier and has not been re-initialised.
    #[error("Connection is broken, re-initialise the session")]
    ConnectionBroken,

    /// No reply within the configured timeout.
    #[error("Timed out after {after:?} waiting for {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The master answered with a failure code.
    #[error("Master rejected {operation}: {message} (code {code})")]
    Master {
        operation: &'static str,
        code: i32,
        kind: ErrorKind,
        message: String,
    },

    /// A record or frame could not be decoded.
    #[error("Format error: {0}")]
    Format(#[from] MarshalError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (log files, configuration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LavaError {
    /// The register kind this error maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LavaError::NotFound(_) => ErrorKind::NotFound,
            LavaError::BadRequest(_) | LavaError::Format(_) | LavaError::Config(_) => {
                ErrorKind::BadRequest
            }
            LavaError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            LavaError::Connection(_) | LavaError::ConnectionBroken => ErrorKind::ConnectionError,
            LavaError::Timeout { .. } => ErrorKind::ConnectionTimeout,
            LavaError::Master { kind, .. } => *kind,
            LavaError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            LavaError::Io(_) => ErrorKind::Unknown,
        }
    }
}

impl From<serde_yaml_ng::Error> for LavaError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        LavaError::Config(e.to_string())
    }
}

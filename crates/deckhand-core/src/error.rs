use std::fmt;

use thiserror::Error;

use crate::types::ResourceKind;

/// Failure of a single HTTP call, tagged with where it happened.
///
/// The endpoint is the request path relative to the base URL, so the
/// diagnostic never carries the host's credentials or the bearer token.
#[derive(Debug, Error)]
#[error("{method} {endpoint}: {kind}")]
pub struct ApiError {
    pub method: String,
    pub endpoint: String,
    pub kind: ApiErrorKind,
}

impl ApiError {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>, kind: ApiErrorKind) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            kind,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.kind.status()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ApiErrorKind::NotFound)
    }
}

/// What went wrong with an HTTP call.
#[derive(Debug, Error)]
pub enum ApiErrorKind {
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("not found (HTTP 404)")]
    NotFound,

    #[error("conflict (HTTP 409): {message}")]
    Conflict { message: String },

    #[error("rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error (HTTP {status})")]
    ServerError { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiErrorKind {
    /// Map a non-success HTTP status and its body to a failure kind.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = summarize_body(body);
        match status {
            401 | 403 => Self::Unauthorized { status },
            404 => Self::NotFound,
            409 => Self::Conflict { message },
            500..=599 => Self::ServerError { status },
            _ => Self::Rejected { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status }
            | Self::Rejected { status, .. }
            | Self::ServerError { status } => Some(*status),
            Self::NotFound => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Network(_) | Self::Timeout | Self::MalformedResponse(_) => None,
        }
    }

    /// Check if the platform refused the request itself (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::NotFound | Self::Conflict { .. } | Self::Rejected { .. }
        )
    }

    /// Get error category for log fields
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } => ErrorCategory::Unauthorized,
            Self::NotFound => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Rejected { .. } => ErrorCategory::Rejected,
            Self::ServerError { .. } => ErrorCategory::Server,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout => ErrorCategory::Timeout,
            Self::MalformedResponse(_) => ErrorCategory::Malformed,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The platform answers `{"message": "..."}` for most failures; anything else
/// is cut down to a single line.
fn summarize_body(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = json.get("message").and_then(|m| m.as_str())
    {
        return message.to_string();
    }
    let line = body.lines().next().unwrap_or_default().trim();
    if line.chars().count() > 200 {
        let cut: String = line.chars().take(200).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

/// Coarse error classes, used as a structured logging field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unauthorized,
    NotFound,
    Conflict,
    Rejected,
    Server,
    Network,
    Timeout,
    Malformed,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Rejected => write!(f, "rejected"),
            Self::Server => write!(f, "server_error"),
            Self::Network => write!(f, "network_error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Malformed => write!(f, "malformed_response"),
        }
    }
}

/// Errors surfaced by the reconciliation client.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0} resources cannot be looked up by name")]
    UnsupportedLookup(ResourceKind),

    #[error("{kind} \"{name}\" does not exist")]
    MissingResource { kind: ResourceKind, name: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Env file error at line {line}: {message}")]
    EnvFile { line: usize, message: String },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest(message.into())
    }

    pub fn missing(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::MissingResource {
            kind,
            name: name.into(),
        }
    }

    /// The failed HTTP call, if this error came from one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the plan client.
//!
//! `classify` turns a fully read HTTP response into an [`ApiError`]; every
//! call in [`crate::client`] goes through it. [`Error`] is the crate-wide
//! error returned by client operations.

use serde::Deserialize;
use std::fmt;

use crate::config::ConfigError;
use crate::identifier::IdentifierError;
use crate::models::PlanError;

/// Header carrying the service's request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Kind of a failed plan service call, derived from the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    NotImplemented,
    Unauthorized,
    AlreadyExists,
    Unclassified,
}

impl ErrorKind {
    /// Maps a status code to a kind. Only exact matches are named.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => ErrorKind::NotFound,
            400 => ErrorKind::BadRequest,
            501 => ErrorKind::NotImplemented,
            401 => ErrorKind::Unauthorized,
            409 => ErrorKind::AlreadyExists,
            _ => ErrorKind::Unclassified,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::NotImplemented => "not implemented",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::Unclassified => "unclassified",
        };
        f.write_str(label)
    }
}

/// Error body returned by the plan service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ServerError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A non-200 response from the plan service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ErrorKind,
    action: String,
    status: u16,
    body: Body,
    request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    Server(ServerError),
    Raw(Option<String>),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Server-provided error code, when the body could be parsed.
    pub fn code(&self) -> Option<&str> {
        match &self.body {
            Body::Server(e) => Some(&e.code),
            Body::Raw(_) => None,
        }
    }

    /// Server-provided message, or the raw body text when it did not parse.
    pub fn message(&self) -> Option<&str> {
        match &self.body {
            Body::Server(e) => Some(&e.message),
            Body::Raw(text) => text.as_deref(),
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {}", self.action)?;
        match (&self.body, self.kind) {
            (Body::Server(e), ErrorKind::Unclassified) => write!(f, ": {} [{}]", e.message, e.code)?,
            (Body::Server(e), _) => write!(f, ": {}", e.message)?,
            (Body::Raw(Some(text)), _) => {
                write!(f, ": unexpected http status {}: {}", self.status, text)?
            }
            (Body::Raw(None), _) => write!(f, ": unexpected http status {}", self.status)?,
        }
        if let Some(id) = &self.request_id {
            write!(f, " (request id {id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match (&self.body, self.kind) {
            (Body::Server(e), kind) if kind != ErrorKind::Unclassified => Some(e),
            _ => None,
        }
    }
}

/// Classifies a fully read response. Returns `Ok(())` only for status 200.
pub fn classify(
    action: &str,
    status: u16,
    body: &[u8],
    request_id: Option<&str>,
) -> Result<(), ApiError> {
    if status == 200 {
        return Ok(());
    }
    let request_id = request_id.filter(|id| !id.is_empty()).map(str::to_string);
    // A JSON object carrying neither field (`{}`, a proxy's own error shape)
    // is treated like an unparseable body.
    let parsed = serde_json::from_slice::<ServerError>(body)
        .ok()
        .filter(|server| !(server.code.is_empty() && server.message.is_empty()));
    let (kind, body) = match parsed {
        Some(server) => (ErrorKind::from_status(status), Body::Server(server)),
        None => {
            let text = std::str::from_utf8(body)
                .ok()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string);
            (ErrorKind::Unclassified, Body::Raw(text))
        }
    };
    Err(ApiError {
        kind,
        action: action.to_string(),
        status,
        body,
        request_id,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to {action}: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    InvalidPlan(#[from] PlanError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// Command line arguments that parse but do not make sense together.
    #[error("{0}")]
    Usage(String),
    #[error("expected 1 plan for {url}, got {count}")]
    PlanCount { url: String, count: usize },
}

impl Error {
    /// Kind of a classified service error; `None` for local failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api(e) => Some(e.kind()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types shared by every Werval crate

use http::{Method, StatusCode};

/// Result type for Werval operations
pub type Result<T> = std::result::Result<T, WervalError>;

/// Errors raised while wiring an application or processing a request
///
/// Wiring errors (`FilterInstantiation`, `ControllerInstantiation`, `Wiring`,
/// `Config`) denote application defects and are never retried. Errors raised by
/// controllers travel unchanged through every filter up to
/// the `Global` error handler that turns them into an outcome.
#[derive(Debug, thiserror::Error)]
pub enum WervalError {
    #[error("No Context in this task ({0})")]
    NoContext(String),

    #[error("Unable to obtain an instance of filter '{filter}': {reason}")]
    FilterInstantiation { filter: String, reason: String },

    #[error("Unable to obtain an instance of controller '{controller}': {reason}")]
    ControllerInstantiation { controller: String, reason: String },

    #[error("Wiring error: {0}")]
    Wiring(String),

    #[error("No route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("Configuration error for key '{key}': {reason}")]
    Config { key: String, reason: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Task aborted before completion")]
    TaskAborted,

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Application(Box<dyn std::error::Error + Send + Sync>),
}

impl WervalError {
    /// Wrap an application error raised by a controller or a filter
    pub fn application(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Application(err.into())
    }

    /// Create a wiring error
    pub fn wiring(msg: impl Into<String>) -> Self {
        Self::Wiring(msg.into())
    }

    /// Create a configuration error
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Whether this error denotes an application wiring defect
    pub fn is_wiring_error(&self) -> bool {
        matches!(
            self,
            Self::FilterInstantiation { .. }
                | Self::ControllerInstantiation { .. }
                | Self::Wiring(_)
                | Self::Config { .. }
        )
    }

    /// HTTP status an error handler should answer with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

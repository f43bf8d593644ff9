//! # Werval HTTP Server
//!
//! HTTP/1 transport for Werval applications, built on hyper.
//!
//! Wire requests are converted into [`werval_api::Request`]s, dispatched
//! through [`werval_runtime::ApplicationInstance::handle_request`], and the
//! resulting outcomes are written back, streamed when their body is a stream.
//!
//! ## Features
//! - Bind address and body size limit from `werval.http.*` configuration
//! - `413 Payload Too Large` for bodies over the limit
//! - Graceful stop on a caller-provided shutdown signal

pub mod body;
pub mod server;

#[cfg(test)]
mod tests;

pub use body::{ResponseBody, into_response};
pub use server::{HttpServer, HttpServerBuilder, ServerConfig};

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP server errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Werval(#[from] werval_api::WervalError),

    #[error("Invalid bind address '{0}'")]
    InvalidAddress(String),
}

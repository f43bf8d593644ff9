//! HTTP request, response and session types

pub mod request;
pub mod response;
pub mod session;

pub use request::{Parameters, Request, RequestBuilder};
pub use response::{ResponseHeader, StatusClass};
pub use session::Session;

/// Header names used by the framework
pub mod names {
    use http::HeaderName;

    /// Identity of the request, echoed on every response
    pub const X_WERVAL_REQUEST_ID: HeaderName = HeaderName::from_static("x-werval-request-id");
    /// Do Not Track
    pub const DNT: HeaderName = HeaderName::from_static("dnt");
}

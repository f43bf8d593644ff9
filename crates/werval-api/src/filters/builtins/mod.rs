//! Built-in filters
//!
//! Each built-in filter comes with an annotation kind associating it. Attribute
//! values of the annotation instance override the defaults read from the
//! `werval.filters.*` configuration.
//!
//! | kind                   | attributes                                             |
//! |------------------------|--------------------------------------------------------|
//! | `XFrameOptions`        | `value`                                                |
//! | `XXSSProtection`       | `value`                                                |
//! | `HSTS`                 | `max_age` (seconds, `-1` for configured), `include_sub_domains` |
//! | `NeverCached`          | `value` (status classes, empty for all)                |
//! | `DoNotTrack`           | `opt_in`                                               |
//! | `AcceptContentTypes`   | `value` (accepted MIME types)                          |
//! | `CORS`                 | `allow_origin`, `allow_credentials`, `expose_headers`  |
//!
//! # Examples
//!
//! ```rust
//! use werval_api::filters::builtins::{ACCEPT_CONTENT_TYPES, X_FRAME_OPTIONS};
//! use werval_api::ControllerMethod;
//! # use std::sync::Arc;
//! # use werval_api::Context;
//! # #[derive(Default)]
//! # struct Api;
//!
//! let create = ControllerMethod::builder("create")
//!     .annotated(ACCEPT_CONTENT_TYPES.instance().with("value", vec!["application/json"]))
//!     .annotated(X_FRAME_OPTIONS.instance().with("value", "SAMEORIGIN"))
//!     .handler(|_: Arc<Api>, context: Context| async move { context.outcomes().created().build() });
//! # assert_eq!(create.markers().len(), 2);
//! ```

mod accept_content_types;
mod cors;
mod do_not_track;
mod never_cached;
mod security_headers;

pub use accept_content_types::{ACCEPT_CONTENT_TYPES, AcceptContentTypesFilter};
pub use cors::{CORS, CorsFilter};
pub use do_not_track::{DNT_META_DATA_KEY, DO_NOT_TRACK, DoNotTrackFilter};
pub use never_cached::{NEVER_CACHED, NeverCachedFilter};
pub use security_headers::{
    HSTS, HstsFilter, X_FRAME_OPTIONS, X_XSS_PROTECTION, XFrameOptionsFilter,
    XXssProtectionFilter,
};

#[cfg(test)]
pub(crate) mod test_chain {
    use crate::{Context, FilterChain, Outcome, Result};

    /// Chain whose tail answers `200 OK` with a text body
    pub(crate) fn ok() -> FilterChain {
        FilterChain::from_fn(|context: Context| async move {
            context.outcomes().ok().with_body("controller").build()
        })
    }

    /// Chain whose tail answers with the given outcome builder
    pub(crate) fn answering<F>(f: F) -> FilterChain
    where
        F: FnOnce(&Context) -> Result<Outcome> + Send + 'static,
    {
        FilterChain::from_fn(move |context: Context| async move { f(&context) })
    }
}

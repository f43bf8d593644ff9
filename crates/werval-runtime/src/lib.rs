//! # Werval Runtime
//!
//! Request processing engine of the Werval web framework.
//!
//! ## Overview
//! - [`FilterResolver`]: resolves, once per controller method, the ordered
//!   filters declared on the controller type hierarchy and the method
//! - [`FilterChainFactory`]: builds the per-request chain of filter steps
//!   ending with the controller invocation
//! - [`Global`]: filter and controller instantiation, controller invocation
//!   and error mapping hooks
//! - [`Routes`]: first-match-wins route table
//! - [`ApplicationExecutors`]: configured executors propagating the request
//!   context
//! - [`ApplicationInstance`]: assembled application dispatching requests

pub mod application;
pub mod executors;
pub mod filters;
pub mod global;
pub mod routes;

#[cfg(test)]
mod tests;

pub use application::{ApplicationBuilder, ApplicationInstance};
pub use executors::ApplicationExecutors;
pub use filters::{FilterChainFactory, FilterResolver, resolve_filters};
pub use global::{DefaultGlobal, Global};
pub use routes::Routes;

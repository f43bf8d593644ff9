//! # Werval API
//!
//! Contracts of the Werval web framework, shared by applications and the
//! runtime.
//!
//! ## Overview
//! - [`Context`]: per-request aggregate handed to filters and controllers
//! - [`Filter`] and [`FilterChain`]: composable request processing around a
//!   controller method
//! - [`annotations`]: declarative association of filters to controllers and
//!   methods, through direct markers, meta-annotations and repeatable
//!   annotations
//! - [`Outcomes`]: builders for the [`Outcome`] of a request
//! - [`CurrentContext`] and [`ContextExecutor`]: ambient request context
//!   propagated across task boundaries
//! - [`filters::builtins`]: security, caching and CORS filters

pub mod annotations;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod filters;
pub mod http;
pub mod metadata;
pub mod outcomes;
pub mod plugins;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

pub use annotations::{AnnotationInstance, AnnotationKind, FilterType, Marker, Namespace};
pub use config::Config;
pub use context::{
    Application, Context, ContextExecutor, CurrentContext, Executor, Spawned, TokioExecutor,
    with_context, with_context_sync,
};
pub use controller::{ControllerInstance, ControllerMethod, ControllerType};
pub use error::{Result, WervalError};
pub use filters::{Filter, FilterChain, FilterDescriptor, NextStep};
pub use http::{Parameters, Request, ResponseHeader, Session, StatusClass};
pub use metadata::MetaData;
pub use outcomes::{Body, Outcome, OutcomeBuilder, Outcomes};
pub use plugins::Plugins;
pub use routes::Route;

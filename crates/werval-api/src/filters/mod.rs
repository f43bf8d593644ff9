//! Filter contract
//!
//! A filter wraps the execution of a controller method. It receives the
//! remaining [`FilterChain`], the request [`Context`] and the annotation
//! instance that associated it, if any, and must return an [`Outcome`]:
//!
//! - produced by itself (short-circuit), or
//! - obtained from `chain.next(context)`, optionally decorated
//!
//! [`FilterChain::next`] consumes the chain, so a filter delegates at most once.
//!
//! # Examples
//!
//! ```rust
//! use werval_api::{AnnotationInstance, Context, Filter, FilterChain, Outcome, Result};
//! use async_trait::async_trait;
//!
//! #[derive(Default)]
//! struct RequireAuthorization;
//!
//! #[async_trait]
//! impl Filter for RequireAuthorization {
//!     async fn filter(
//!         &self,
//!         chain: FilterChain,
//!         context: Context,
//!         _annotation: Option<AnnotationInstance>,
//!     ) -> Result<Outcome> {
//!         if !context.request().has_header("authorization") {
//!             return context.outcomes().unauthorized().build();
//!         }
//!         context.meta_data().put("authenticated", &true)?;
//!         chain.next(context).await
//!     }
//! }
//! ```

pub mod builtins;

use std::future::Future;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::annotations::{AnnotationInstance, FilterType};
use crate::{Context, Outcome, Result};

/// A cross-cutting unit of request processing composed around a controller
#[async_trait]
pub trait Filter: Send + Sync {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome>;
}

/// One node of a filter chain
///
/// Implemented by the runtime for filter steps and for the controller tail.
pub trait NextStep: Send {
    fn next(self: Box<Self>, context: Context) -> BoxFuture<'static, Result<Outcome>>;

    /// Number of nodes from this one down to the tail, included
    fn depth(&self) -> usize {
        1
    }
}

/// Remainder of a filter chain, handed to each filter
pub struct FilterChain {
    step: Box<dyn NextStep>,
}

impl FilterChain {
    pub fn new(step: impl NextStep + 'static) -> Self {
        Self {
            step: Box::new(step),
        }
    }

    /// Chain whose only node runs the given function
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Outcome>> + Send + 'static,
    {
        Self::new(FnStep(f))
    }

    /// Delegate to the rest of the chain
    pub async fn next(self, context: Context) -> Result<Outcome> {
        self.step.next(context).await
    }

    /// Number of remaining nodes, tail included
    pub fn depth(&self) -> usize {
        self.step.depth()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("depth", &self.depth())
            .finish()
    }
}

struct FnStep<F>(F);

impl<F, Fut> NextStep for FnStep<F>
where
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Outcome>> + Send + 'static,
{
    fn next(self: Box<Self>, context: Context) -> BoxFuture<'static, Result<Outcome>> {
        (self.0)(context).boxed()
    }
}

/// A resolved filter association: the filter type and the annotation
/// instance that configures it
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    filter: FilterType,
    annotation: Option<AnnotationInstance>,
}

impl FilterDescriptor {
    pub fn new(filter: FilterType, annotation: Option<AnnotationInstance>) -> Self {
        Self { filter, annotation }
    }

    pub fn filter(&self) -> &FilterType {
        &self.filter
    }

    pub fn annotation(&self) -> Option<&AnnotationInstance> {
        self.annotation.as_ref()
    }
}

//! Filter chain construction and execution

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::trace;
use werval_api::{Context, FilterChain, FilterDescriptor, NextStep, Outcome, Result};

use crate::global::Global;

/// Builds the filter chain of a request
pub struct FilterChainFactory;

impl FilterChainFactory {
    /// Chain running `descriptors` in order, then the controller tail
    ///
    /// Built from the tail backwards: each descriptor wraps the chain of the
    /// descriptors following it.
    pub fn build(global: &Arc<dyn Global>, descriptors: &[FilterDescriptor]) -> FilterChain {
        let tail = FilterChain::new(ControllerTail {
            global: Arc::clone(global),
        });
        descriptors.iter().rev().fold(tail, |next, descriptor| {
            FilterChain::new(FilterStep {
                global: Arc::clone(global),
                descriptor: descriptor.clone(),
                next,
            })
        })
    }
}

/// Runs one filter with the rest of the chain
struct FilterStep {
    global: Arc<dyn Global>,
    descriptor: FilterDescriptor,
    next: FilterChain,
}

impl NextStep for FilterStep {
    fn next(self: Box<Self>, context: Context) -> BoxFuture<'static, Result<Outcome>> {
        let FilterStep {
            global,
            descriptor,
            next,
        } = *self;
        async move {
            let filter =
                global.filter_instance(context.application().as_ref(), descriptor.filter())?;
            trace!(filter = descriptor.filter().name(), "Invoking filter");
            filter
                .filter(next, context, descriptor.annotation().cloned())
                .await
        }
        .boxed()
    }

    fn depth(&self) -> usize {
        1 + self.next.depth()
    }
}

/// Invokes the routed controller method
struct ControllerTail {
    global: Arc<dyn Global>,
}

impl NextStep for ControllerTail {
    fn next(self: Box<Self>, context: Context) -> BoxFuture<'static, Result<Outcome>> {
        let global = self.global;
        async move {
            let route = Arc::clone(context.route());
            let controller =
                global.controller_instance(context.application().as_ref(), route.controller_type())?;
            trace!(route = %route, "Invoking controller");
            global.invoke_controller_method(context, controller).await
        }
        .boxed()
    }
}

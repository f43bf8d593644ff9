//! Ambient request context
//!
//! The context of the request being processed is installed as a task-local
//! value for the scope of a unit of work, together with a `werval_request`
//! tracing span carrying the correlation fields enabled by configuration
//! (`werval.http.log.context.*`). Leaving the scope, normally or by
//! unwinding, restores whatever was installed before.

use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, Span};

use super::{Application, Context, ContextExecutor};
use crate::config::keys;
use crate::http::{Request, ResponseHeader, Session};
use crate::{MetaData, Outcomes, Result, WervalError};

tokio::task_local! {
    static CURRENT_CONTEXT: Context;
}

/// Lookups of the ambient request context
///
/// # Examples
///
/// ```rust
/// use werval_api::CurrentContext;
///
/// // Outside of any request
/// assert!(CurrentContext::optional().is_none());
/// assert!(CurrentContext::get().is_err());
/// ```
pub struct CurrentContext;

impl CurrentContext {
    /// Context installed for the current task, if any
    pub fn optional() -> Option<Context> {
        CURRENT_CONTEXT.try_with(Context::clone).ok()
    }

    /// Context installed for the current task
    pub fn get() -> Result<Context> {
        Self::optional().ok_or_else(|| {
            WervalError::NoContext("the current task is not processing a request".to_string())
        })
    }

    pub fn is_set() -> bool {
        CURRENT_CONTEXT.try_with(|_| ()).is_ok()
    }

    pub fn application() -> Result<Arc<dyn Application>> {
        Self::get().map(|context| Arc::clone(context.application()))
    }

    pub fn meta_data() -> Result<MetaData> {
        Self::get().map(|context| context.meta_data().clone())
    }

    pub fn session() -> Result<Session> {
        Self::get().map(|context| context.session().clone())
    }

    pub fn request() -> Result<Request> {
        Self::get().map(|context| context.request().clone())
    }

    /// Apply `f` to the response header of the current request
    pub fn response<R>(f: impl FnOnce(&mut ResponseHeader) -> R) -> Result<R> {
        Self::get().map(|context| f(&mut context.response()))
    }

    pub fn outcomes() -> Result<Outcomes> {
        Self::get().map(|context| context.outcomes().clone())
    }

    pub fn executor() -> Result<ContextExecutor> {
        Self::get().map(|context| context.executor().clone())
    }

    /// Plugin API of type `T`, `None` when no such plugin is registered
    pub fn plugin<T: std::any::Any + Send + Sync>() -> Result<Option<Arc<T>>> {
        Self::get().map(|context| context.application().plugin::<T>())
    }
}

/// Run a future with `context` installed as the ambient context
pub async fn with_context<F>(context: Context, unit_of_work: F) -> F::Output
where
    F: Future,
{
    let span = request_span(&context);
    CURRENT_CONTEXT
        .scope(context, unit_of_work.instrument(span))
        .await
}

/// Run a closure with `context` installed as the ambient context
pub fn with_context_sync<F, R>(context: Context, unit_of_work: F) -> R
where
    F: FnOnce() -> R,
{
    let span = request_span(&context);
    CURRENT_CONTEXT.sync_scope(context, || span.in_scope(unit_of_work))
}

fn request_span(context: &Context) -> Span {
    let config = context.config();
    let request = context.request();
    let request_id = config
        .bool_or(keys::HTTP_LOG_CONTEXT_REQUEST_ID, true)
        .then(|| request.identity());
    let client_ip = request
        .remote_address()
        .filter(|_| config.bool_or(keys::HTTP_LOG_CONTEXT_CLIENT_IP, false));
    tracing::info_span!(
        "werval_request",
        request_id = request_id,
        client_ip = client_ip.map(tracing::field::display),
    )
}

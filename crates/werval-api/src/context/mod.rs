//! Per-request context handed to every filter and controller
//!
//! A [`Context`] is created once per request by the dispatch layer and
//! discarded once the outcome is produced. Clones share the same request
//! state: metadata, session and response header written through one clone are
//! visible through every other.

mod current;
mod executor;

pub use current::{CurrentContext, with_context, with_context_sync};
pub use executor::{ContextExecutor, Executor, Spawned, TokioExecutor};

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::http::{Request, ResponseHeader, Session};
use crate::{Config, MetaData, Outcomes, Plugins, Route};

/// Application handle as seen from a request
pub trait Application: Send + Sync {
    fn config(&self) -> &Config;

    fn plugins(&self) -> &Plugins;

    /// Default executor, propagating the ambient context
    fn executor(&self) -> ContextExecutor;
}

impl dyn Application {
    /// Plugin API of type `T`
    pub fn plugin<T: std::any::Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.plugins().get::<T>()
    }
}

struct ContextInner {
    application: Arc<dyn Application>,
    session: Session,
    route: Arc<Route>,
    request: Request,
    response: Arc<Mutex<ResponseHeader>>,
    outcomes: Outcomes,
    meta_data: MetaData,
    executor: ContextExecutor,
}

/// Handle over the state of one request
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(
        application: Arc<dyn Application>,
        route: Arc<Route>,
        request: Request,
        session: Session,
    ) -> Self {
        let response = Arc::new(Mutex::new(ResponseHeader::new()));
        let outcomes = Outcomes::new(Arc::clone(&response));
        let executor = application.executor();
        Self {
            inner: Arc::new(ContextInner {
                application,
                session,
                route,
                request,
                response,
                outcomes,
                meta_data: MetaData::new(),
                executor,
            }),
        }
    }

    pub fn application(&self) -> &Arc<dyn Application> {
        &self.inner.application
    }

    /// Application configuration
    pub fn config(&self) -> &Config {
        self.inner.application.config()
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.inner.route
    }

    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// Lock the response header of this request
    ///
    /// Outcomes built afterwards start from the locked header, do not hold the
    /// guard across an await point.
    pub fn response(&self) -> MutexGuard<'_, ResponseHeader> {
        self.inner.response.lock()
    }

    pub fn outcomes(&self) -> &Outcomes {
        &self.inner.outcomes
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.inner.meta_data
    }

    /// Executor propagating this context to the tasks it runs
    pub fn executor(&self) -> &ContextExecutor {
        &self.inner.executor
    }

    /// Whether both handles refer to the same request
    pub fn same_request(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.inner.request.identity())
            .field("route", &self.inner.route.to_string())
            .field("meta_data", &self.inner.meta_data.keys())
            .finish()
    }
}

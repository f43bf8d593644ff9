//! Executors propagating the ambient context to the tasks they run

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::{CurrentContext, with_context};
use crate::{Result, WervalError};

/// Task submission facility
pub trait Executor: Send + Sync {
    fn execute(&self, task: BoxFuture<'static, ()>);
}

/// Executor spawning tasks on a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor over the runtime of the calling task, if any
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        drop(self.handle.spawn(task));
    }
}

/// Executor decorator propagating the ambient context
///
/// The context ambient when a task is submitted is installed around the task
/// when it runs, possibly on another worker thread. Tasks submitted outside of
/// any request run without context.
///
/// # Examples
///
/// ```rust
/// use werval_api::{ContextExecutor, CurrentContext, TokioExecutor};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = ContextExecutor::new("background", TokioExecutor::try_current().unwrap());
///
/// let had_context = executor.spawn(async { CurrentContext::is_set() }).await.unwrap();
/// assert!(!had_context);
/// # }
/// ```
#[derive(Clone)]
pub struct ContextExecutor {
    name: Arc<str>,
    inner: Arc<dyn Executor>,
}

impl ContextExecutor {
    pub fn new(name: impl Into<Arc<str>>, executor: impl Executor + 'static) -> Self {
        Self::from_arc(name, Arc::new(executor))
    }

    pub fn from_arc(name: impl Into<Arc<str>>, executor: Arc<dyn Executor>) -> Self {
        Self {
            name: name.into(),
            inner: executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a task, fire and forget
    pub fn execute<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let captured = CurrentContext::optional();
        let task = async move {
            match captured {
                Some(context) => with_context(context, task).await,
                None => task.await,
            }
        };
        self.inner.execute(task.boxed());
    }

    /// Submit a task and obtain its output
    ///
    /// The returned future fails with [`WervalError::TaskAborted`] when the
    /// task is dropped before completion, e.g. because it panicked.
    pub fn spawn<F, T>(&self, task: F) -> Spawned<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.execute(async move {
            let _ = sender.send(task.await);
        });
        Spawned { receiver }
    }
}

impl fmt::Debug for ContextExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextExecutor")
            .field("name", &self.name)
            .finish()
    }
}

/// Output of a task submitted with [`ContextExecutor::spawn`]
#[derive(Debug)]
pub struct Spawned<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for Spawned<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.map_err(|_| WervalError::TaskAborted))
    }
}

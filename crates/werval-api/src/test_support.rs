//! Minimal application used by unit tests

use std::sync::Arc;

use futures::future::BoxFuture;
use http::{Method, Uri};

use crate::{
    Application, Config, Context, ContextExecutor, ControllerMethod, ControllerType, Executor,
    Plugins, Request, Route, Session,
};

/// Spawns on the runtime of the submitting task
struct AmbientExecutor;

impl Executor for AmbientExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}

#[derive(Default)]
struct Index;

pub(crate) struct TestApplication {
    config: Config,
    plugins: Plugins,
    executor: ContextExecutor,
    route: Arc<Route>,
}

impl TestApplication {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_config(Config::reference().unwrap())
    }

    pub(crate) fn with_config(config: Config) -> Arc<Self> {
        let controller = ControllerType::builder("Test")
            .constructor::<Index>()
            .method(ControllerMethod::builder("index").handler(
                |_: Arc<Index>, context: Context| async move { context.outcomes().ok().build() },
            ))
            .build();
        let route = Route::new(Method::GET, "/*path", &controller, "index").unwrap();
        Arc::new(Self {
            config,
            plugins: Plugins::new(),
            executor: ContextExecutor::new("test", AmbientExecutor),
            route: Arc::new(route),
        })
    }

    pub(crate) fn context(self: &Arc<Self>, path: &str) -> Context {
        let request = Request::builder(Method::GET, path.parse::<Uri>().unwrap()).build();
        self.context_for(request)
    }

    pub(crate) fn context_for(self: &Arc<Self>, request: Request) -> Context {
        Context::new(
            Arc::clone(self) as Arc<dyn Application>,
            Arc::clone(&self.route),
            request,
            Session::new(),
        )
    }
}

impl Application for TestApplication {
    fn config(&self) -> &Config {
        &self.config
    }

    fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    fn executor(&self) -> ContextExecutor {
        self.executor.clone()
    }
}

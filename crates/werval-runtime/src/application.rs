//! Application assembly and request dispatch

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use werval_api::http::names::X_WERVAL_REQUEST_ID;
use werval_api::{
    Application, Config, Context, ContextExecutor, Filter, Outcome, Plugins, Request, Result,
    Route, Session, with_context,
};

use crate::executors::ApplicationExecutors;
use crate::filters::{FilterChainFactory, FilterResolver};
use crate::global::{DefaultGlobal, Global};
use crate::routes::Routes;

/// An assembled, running application
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use http::{Method, Uri};
/// use werval_api::{Context, ControllerMethod, ControllerType, Request, Route};
/// use werval_runtime::ApplicationInstance;
///
/// #[derive(Default)]
/// struct Hello;
///
/// # #[tokio::main]
/// # async fn main() -> werval_api::Result<()> {
/// let controller = ControllerType::builder("Hello")
///     .constructor::<Hello>()
///     .method(ControllerMethod::builder("index").handler(
///         |_: Arc<Hello>, context: Context| async move {
///             context.outcomes().ok().as_text_plain().with_body("Hello").build()
///         },
///     ))
///     .build();
///
/// let application = ApplicationInstance::builder()
///     .route(Route::new(Method::GET, "/", &controller, "index")?)
///     .build()?;
///
/// let outcome = application
///     .handle_request(Request::builder(Method::GET, Uri::from_static("/")).build())
///     .await;
/// assert_eq!(outcome.status().as_u16(), 200);
/// assert!(outcome.response_header().header("x-werval-request-id").is_some());
/// # Ok(())
/// # }
/// ```
pub struct ApplicationInstance {
    config: Config,
    plugins: Plugins,
    routes: Routes,
    global: Arc<dyn Global>,
    executors: ApplicationExecutors,
    resolver: FilterResolver,
}

impl ApplicationInstance {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn global(&self) -> &Arc<dyn Global> {
        &self.global
    }

    pub fn executors(&self) -> &ApplicationExecutors {
        &self.executors
    }

    /// Process a request and produce its outcome
    ///
    /// Routes the request, runs the filter chain of the routed controller
    /// method on the default executor with the request context installed, and
    /// maps errors to outcomes through [`Global::on_request_error`]. Every
    /// outcome carries the `X-Werval-Request-ID` header.
    pub async fn handle_request(self: &Arc<Self>, request: Request) -> Outcome {
        let started = Instant::now();
        let identity = request.identity().to_string();
        let method = request.method().clone();
        let path = request.path().to_string();

        let mut outcome = self.dispatch(request).await;

        if let Err(err) = outcome
            .response_header_mut()
            .insert(X_WERVAL_REQUEST_ID, &identity)
        {
            warn!(request_id = %identity, error = %err, "Unable to set request id header");
        }
        debug!(
            request_id = %identity,
            method = %method,
            path = %path,
            status = outcome.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );
        outcome
    }

    async fn dispatch(self: &Arc<Self>, request: Request) -> Outcome {
        let (route, parameters) = match self.routes.route(request.method(), request.path()) {
            Ok(found) => found,
            Err(err) => return self.global.on_request_error(&**self, &request, err),
        };

        let context = Context::new(
            Arc::clone(self) as Arc<dyn Application>,
            route,
            request.with_path_parameters(parameters),
            Session::new(),
        );
        let descriptors = self.resolver.resolve(
            context.route().controller_type(),
            context.route().controller_method(),
        );
        let chain = FilterChainFactory::build(&self.global, &descriptors);

        let result = context
            .executor()
            .spawn(with_context(context.clone(), chain.next(context.clone())))
            .await
            .and_then(|result| result);

        match result {
            Ok(outcome) => outcome,
            Err(err) => self
                .global
                .on_request_error(&**self, context.request(), err),
        }
    }

    /// Passivate the application and stop its executors
    ///
    /// Executors stop once the last reference to the application is dropped.
    pub fn shutdown(self: Arc<Self>) {
        self.global.on_passivate(&*self);
        match Arc::try_unwrap(self) {
            Ok(application) => application.executors.shutdown(),
            Err(_) => warn!("Application still referenced, executors stop with the last reference"),
        }
    }
}

impl Application for ApplicationInstance {
    fn config(&self) -> &Config {
        &self.config
    }

    fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    fn executor(&self) -> ContextExecutor {
        self.executors.default_executor()
    }
}

impl fmt::Debug for ApplicationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationInstance")
            .field("routes", &self.routes.len())
            .field("plugins", &self.plugins)
            .field("executors", &self.executors)
            .finish()
    }
}

/// Builder for [`ApplicationInstance`]
#[derive(Default)]
pub struct ApplicationBuilder {
    config: Option<Config>,
    plugins: Plugins,
    routes: Routes,
    global: Option<Arc<dyn Global>>,
}

impl ApplicationBuilder {
    /// Configuration, the reference configuration when not set
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn global(mut self, global: impl Global + 'static) -> Self {
        self.global = Some(Arc::new(global));
        self
    }

    /// Register a plugin API
    pub fn plugin<T: std::any::Any + Send + Sync>(mut self, api: T) -> Self {
        self.plugins.register(api);
        self
    }

    /// Provide the instance of a filter type
    pub fn plugin_filter(mut self, filter_type: impl Into<String>, filter: Arc<dyn Filter>) -> Self {
        self.plugins.register_filter(filter_type, filter);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        for route in routes {
            self.routes.push(route);
        }
        self
    }

    /// Assemble and activate the application
    pub fn build(self) -> Result<Arc<ApplicationInstance>> {
        let config = match self.config {
            Some(config) => config,
            None => Config::reference()?,
        };
        let executors = ApplicationExecutors::from_config(&config)?;
        let application = Arc::new(ApplicationInstance {
            config,
            plugins: self.plugins,
            routes: self.routes,
            global: self.global.unwrap_or_else(|| Arc::new(DefaultGlobal)),
            executors,
            resolver: FilterResolver::new(),
        });

        info!(routes = application.routes.len(), "Application assembled");
        for route in application.routes.iter() {
            debug!("Route: {route}");
        }
        application.global.on_activate(&*application);
        Ok(application)
    }
}

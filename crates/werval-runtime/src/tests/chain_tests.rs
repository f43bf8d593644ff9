//! Filter chain semantics: delegation, short-circuits, error propagation and
//! request-scoped metadata

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use tracing_test::traced_test;
use werval_api::{
    AnnotationInstance, Application, Context, ControllerInstance, ControllerMethod,
    ControllerType, Filter, FilterChain, FilterType, Outcome, Request, Result, Route, WervalError,
};

use super::support::{Events, body, config, events, get, recorded, recording};
use crate::{ApplicationInstance, Global};

#[derive(Default)]
struct Controller;

/// Answers `403 Forbidden` without delegating
struct Deny {
    events: Events,
}

#[async_trait]
impl Filter for Deny {
    async fn filter(
        &self,
        _chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        self.events.lock().push("Deny".to_string());
        context.outcomes().forbidden().build()
    }
}

/// Delegates then marks whatever came back
struct Observe {
    events: Events,
}

#[async_trait]
impl Filter for Observe {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        self.events.lock().push("Observe".to_string());
        match chain.next(context).await {
            Ok(mut outcome) => {
                let status = outcome.status();
                outcome
                    .response_header_mut()
                    .set_header("X-Observed-Status", status.as_str())?;
                Ok(outcome)
            }
            Err(err) => {
                self.events.lock().push(format!("Observe saw: {err}"));
                Err(err)
            }
        }
    }
}

/// Stores claims for downstream readers
#[derive(Default)]
struct Authenticate;

#[async_trait]
impl Filter for Authenticate {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        if let Some(user) = context.request().header("x-user") {
            context.meta_data().put("claims.subject", user)?;
        }
        chain.next(context).await
    }
}

fn filter_type<F>(name: &str, events: &Events, build: fn(Events) -> F) -> FilterType
where
    F: Filter + 'static,
{
    let events = Arc::clone(events);
    FilterType::with_constructor(name, move || Arc::new(build(Arc::clone(&events))) as Arc<dyn Filter>)
}

fn controller(method: Arc<ControllerMethod>) -> Arc<ControllerType> {
    ControllerType::builder("Controller")
        .constructor::<Controller>()
        .method(method)
        .build()
}

fn application(controller: &Arc<ControllerType>) -> Arc<ApplicationInstance> {
    ApplicationInstance::builder()
        .config(config())
        .route(Route::new(Method::GET, "/", controller, "index").unwrap())
        .build()
        .unwrap()
}

fn recording_controller(events: &Events, filters: Vec<FilterType>) -> Arc<ControllerType> {
    let controller_events = Arc::clone(events);
    controller(ControllerMethod::builder("index").filter_with(filters).handler(
        move |_: Arc<Controller>, context: Context| {
            let events = Arc::clone(&controller_events);
            async move {
                events.lock().push("Controller".to_string());
                context.outcomes().ok().with_body("controller").build()
            }
        },
    ))
}

#[tokio::test]
async fn test_delegation_order_and_unmodified_outcome() {
    let events = events();
    let controller = recording_controller(
        &events,
        vec![
            recording("F1", &events),
            recording("F2", &events),
            recording("F3", &events),
        ],
    );

    let outcome = application(&controller).handle_request(get("/")).await;

    assert_eq!(recorded(&events), vec!["F1", "F2", "F3", "Controller"]);
    assert_eq!(outcome.status(), StatusCode::OK);
    assert_eq!(body(outcome).await, "controller");
}

#[tokio::test]
async fn test_short_circuit_skips_downstream() {
    let events = events();
    let controller = recording_controller(
        &events,
        vec![
            filter_type("Observe", &events, |events| Observe { events }),
            filter_type("Deny", &events, |events| Deny { events }),
            recording("F3", &events),
        ],
    );

    let outcome = application(&controller).handle_request(get("/")).await;

    assert_eq!(recorded(&events), vec!["Observe", "Deny"]);
    assert_eq!(outcome.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        outcome.response_header().header("x-observed-status"),
        Some("403")
    );
}

#[tokio::test]
#[traced_test]
async fn test_controller_errors_propagate_through_filters() {
    let events = events();
    let controller = controller(
        ControllerMethod::builder("index")
            .filter_with([filter_type("Observe", &events, |events| Observe { events })])
            .handler(|_: Arc<Controller>, _context: Context| async move {
                Err::<Outcome, _>(WervalError::application("database unavailable"))
            }),
    );

    let outcome = application(&controller).handle_request(get("/")).await;

    assert_eq!(
        recorded(&events),
        vec!["Observe", "Observe saw: database unavailable"]
    );
    assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(outcome).await, "500 Internal Server Error\n");
    assert!(logs_contain("Request failed"));
}

#[tokio::test]
#[traced_test]
async fn test_panicking_controller_answers_500() {
    let controller = controller(ControllerMethod::builder("index").handler(
        |_: Arc<Controller>, context: Context| async move {
            if context.request().header("x-user").is_none() {
                panic!("controller bug");
            }
            context.outcomes().ok().build()
        },
    ));
    let application = application(&controller);

    let outcome = application.handle_request(get("/")).await;
    assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(outcome.response_header().header("x-werval-request-id").is_some());
    assert!(logs_contain("Task aborted before completion"));

    // The application keeps serving
    let outcome = application.handle_request(get("/")).await;
    assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_filter_without_instance_is_a_wiring_error() {
    let events = events();
    let controller = recording_controller(&events, vec![FilterType::named("Provided.ByPlugin")]);

    let outcome = application(&controller).handle_request(get("/")).await;
    assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(recorded(&events).is_empty());

    // The same filter type provided by a plugin
    let application = ApplicationInstance::builder()
        .config(config())
        .plugin_filter(
            "Provided.ByPlugin",
            Arc::new(Recording {
                events: Arc::clone(&events),
            }),
        )
        .route(Route::new(Method::GET, "/", &controller, "index").unwrap())
        .build()
        .unwrap();
    let outcome = application.handle_request(get("/")).await;
    assert_eq!(outcome.status(), StatusCode::OK);
    assert_eq!(recorded(&events), vec!["Plugin", "Controller"]);
}

struct Recording {
    events: Events,
}

#[async_trait]
impl Filter for Recording {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        self.events.lock().push("Plugin".to_string());
        chain.next(context).await
    }
}

#[tokio::test]
async fn test_meta_data_is_request_scoped() {
    let controller = controller(
        ControllerMethod::builder("index")
            .filter_with([FilterType::of::<Authenticate>("Authenticate")])
            .handler(|_: Arc<Controller>, context: Context| async move {
                let subject = context
                    .meta_data()
                    .get_as::<String>("claims.subject")?
                    .unwrap_or_else(|| "anonymous".to_string());
                context.outcomes().ok().with_body(subject).build()
            }),
    );
    let application = application(&controller);

    let authenticated = Request::builder(Method::GET, "/".parse().unwrap())
        .header("X-User", "alice")
        .unwrap()
        .build();
    assert_eq!(body(application.handle_request(authenticated).await).await, "alice");
    assert_eq!(body(application.handle_request(get("/")).await).await, "anonymous");
}

/// Denies unless the matched route carries the `public` modifier
#[derive(Default)]
struct RequirePublic;

#[async_trait]
impl Filter for RequirePublic {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        if context.route().has_modifier("public") {
            chain.next(context).await
        } else {
            context.outcomes().forbidden().build()
        }
    }
}

#[tokio::test]
async fn test_filters_read_route_modifiers() {
    let controller = controller(
        ControllerMethod::builder("index")
            .filter_with([FilterType::of::<RequirePublic>("RequirePublic")])
            .handler(|_: Arc<Controller>, context: Context| async move {
                let modifiers = context.route().modifiers().join(",");
                context.outcomes().ok().with_body(modifiers).build()
            }),
    );
    let application = ApplicationInstance::builder()
        .config(config())
        .route(
            Route::new(Method::GET, "/open", &controller, "index")
                .unwrap()
                .with_modifiers(["public", "cached"]),
        )
        .route(Route::new(Method::GET, "/closed", &controller, "index").unwrap())
        .build()
        .unwrap();

    let outcome = application.handle_request(get("/open")).await;
    assert_eq!(outcome.status(), StatusCode::OK);
    assert_eq!(body(outcome).await, "public,cached");

    let outcome = application.handle_request(get("/closed")).await;
    assert_eq!(outcome.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[traced_test]
async fn test_meta_data_type_mismatch_is_a_server_error() {
    let controller = controller(ControllerMethod::builder("index").handler(
        |_: Arc<Controller>, context: Context| async move {
            context.meta_data().put("count", &"not a number")?;
            let count = context.meta_data().get_as::<u32>("count")?.unwrap_or_default();
            context.outcomes().ok().with_body(count.to_string()).build()
        },
    ));

    let outcome = application(&controller).handle_request(get("/")).await;

    assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // Serializer details stay in the log
    assert_eq!(body(outcome).await, "500 Internal Server Error\n");
    assert!(logs_contain("expected u32"));
}

/// Writes the response header once the outcome is already built
#[derive(Default)]
struct LateHeader;

#[async_trait]
impl Filter for LateHeader {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let outcome = chain.next(context.clone()).await?;
        context.response().set_header("X-Late", "ignored")?;
        Ok(outcome)
    }
}

#[tokio::test]
async fn test_response_header_writes_after_next_do_not_reach_the_outcome() {
    let controller = controller(
        ControllerMethod::builder("index")
            .filter_with([FilterType::of::<LateHeader>("LateHeader")])
            .handler(|_: Arc<Controller>, context: Context| async move {
                context.outcomes().ok().with_body("built").build()
            }),
    );

    let outcome = application(&controller).handle_request(get("/")).await;

    // Outcomes snapshot the response header when the builder is created;
    // after `next` a filter edits the returned outcome instead
    assert_eq!(outcome.status(), StatusCode::OK);
    assert_eq!(outcome.response_header().header("x-late"), None);
}

#[tokio::test]
async fn test_unknown_route() {
    let events = events();
    let controller = recording_controller(&events, Vec::new());

    let outcome = application(&controller).handle_request(get("/nowhere")).await;

    assert_eq!(outcome.status(), StatusCode::NOT_FOUND);
    assert!(outcome.response_header().header("x-werval-request-id").is_some());
    assert_eq!(body(outcome).await, "404 Not Found: No route for GET /nowhere\n");
}

/// Supplies controller instances and answers errors as `503`
struct CustomGlobal;

#[async_trait]
impl Global for CustomGlobal {
    fn controller_instance(
        &self,
        _application: &dyn Application,
        controller: &ControllerType,
    ) -> Result<ControllerInstance> {
        match controller.name() {
            "Injected" => Ok(Arc::new(Controller)),
            other => Err(WervalError::ControllerInstantiation {
                controller: other.to_string(),
                reason: "unknown controller".to_string(),
            }),
        }
    }

    fn on_request_error(
        &self,
        _application: &dyn Application,
        _request: &Request,
        error: WervalError,
    ) -> Outcome {
        Outcome::text(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
    }
}

#[tokio::test]
async fn test_custom_global() {
    let index = || {
        ControllerMethod::builder("index").handler(|_: Arc<Controller>, context: Context| async move {
            context.outcomes().ok().with_body("injected").build()
        })
    };
    // No constructor declared, instances come from the global
    let injected = ControllerType::builder("Injected").method(index()).build();
    let unknown = ControllerType::builder("Unknown").method(index()).build();

    let application = ApplicationInstance::builder()
        .config(config())
        .global(CustomGlobal)
        .route(Route::new(Method::GET, "/injected", &injected, "index").unwrap())
        .route(Route::new(Method::GET, "/unknown", &unknown, "index").unwrap())
        .build()
        .unwrap();

    let outcome = application.handle_request(get("/injected")).await;
    assert_eq!(body(outcome).await, "injected");

    let outcome = application.handle_request(get("/unknown")).await;
    assert_eq!(outcome.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body(outcome).await,
        "Unable to obtain an instance of controller 'Unknown': unknown controller"
    );
}

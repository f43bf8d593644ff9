//! Built-in filters applied through annotations on routed controllers

use std::sync::Arc;

use http::{Method, StatusCode, Uri};
use werval_api::filters::builtins::{
    ACCEPT_CONTENT_TYPES, CORS, DNT_META_DATA_KEY, DO_NOT_TRACK, HSTS, NEVER_CACHED,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use werval_api::{Context, ControllerMethod, ControllerType, Request, Route};

use super::support::{body, config, get};
use crate::ApplicationInstance;

#[derive(Default)]
struct Api;

fn application() -> Arc<ApplicationInstance> {
    let secured = ControllerType::builder("Secured")
        .annotated(X_FRAME_OPTIONS.instance())
        .annotated(X_XSS_PROTECTION.instance())
        .annotated(HSTS.instance().with("max_age", 60))
        .constructor::<Api>()
        .method(
            ControllerMethod::builder("show")
                .annotated(NEVER_CACHED.instance().with("value", vec!["success"]))
                .handler(|_: Arc<Api>, context: Context| async move {
                    context.outcomes().ok().with_body("secret").build()
                }),
        )
        .build();

    let api = ControllerType::builder("Api")
        .annotated(CORS.instance())
        .annotated(DO_NOT_TRACK.instance())
        .constructor::<Api>()
        .method(
            ControllerMethod::builder("create")
                .annotated(
                    ACCEPT_CONTENT_TYPES
                        .instance()
                        .with("value", vec!["application/json"]),
                )
                .handler(|_: Arc<Api>, context: Context| async move {
                    let tracked = !context.meta_data().bool(DNT_META_DATA_KEY).unwrap_or(false);
                    context
                        .outcomes()
                        .created()
                        .with_body(format!("tracked={tracked}"))
                        .build()
                }),
        )
        .build();

    ApplicationInstance::builder()
        .config(config())
        .route(Route::new(Method::GET, "/secured", &secured, "show").unwrap())
        .route(Route::new(Method::POST, "/api", &api, "create").unwrap())
        .build()
        .unwrap()
}

fn post(content_type: Option<&str>, dnt: Option<&str>) -> Request {
    let mut builder = Request::builder(Method::POST, Uri::from_static("/api"))
        .header("Origin", "https://app.example.com")
        .unwrap()
        .body("{}");
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type).unwrap();
    }
    if let Some(dnt) = dnt {
        builder = builder.header("DNT", dnt).unwrap();
    }
    builder.build()
}

#[tokio::test]
async fn test_security_headers() {
    let outcome = application().handle_request(get("/secured")).await;

    assert_eq!(outcome.status(), StatusCode::OK);
    let header = outcome.response_header();
    assert_eq!(header.header("x-frame-options"), Some("DENY"));
    assert_eq!(header.header("x-xss-protection"), Some("1; mode=block"));
    // An annotation without include_sub_domains leaves it off
    assert_eq!(header.header("strict-transport-security"), Some("max-age=60"));
    assert_eq!(
        header.header("cache-control"),
        Some("no-cache, no-store, max-age=0, must-revalidate")
    );
    assert_eq!(header.header("pragma"), Some("no-cache"));
}

#[tokio::test]
async fn test_accepted_content_type_reaches_the_controller() {
    let outcome = application()
        .handle_request(post(Some("application/json; charset=utf-8"), Some("1")))
        .await;

    assert_eq!(outcome.status(), StatusCode::CREATED);
    let header = outcome.response_header();
    assert_eq!(
        header.header("access-control-allow-origin"),
        Some("https://app.example.com")
    );
    assert_eq!(header.header("access-control-allow-credentials"), Some("false"));
    assert_eq!(header.header("access-control-expose-headers"), None);
    assert_eq!(header.header("dnt"), Some("1"));
    assert_eq!(body(outcome).await, "tracked=false");
}

#[tokio::test]
async fn test_rejected_content_types() {
    let application = application();

    let outcome = application.handle_request(post(Some("text/xml"), None)).await;
    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    // Headers set before delegation survive the rejection
    assert_eq!(
        outcome.response_header().header("access-control-allow-origin"),
        Some("https://app.example.com")
    );
    assert_eq!(body(outcome).await, "Unacceptable content-type: `text/xml`");

    let outcome = application.handle_request(post(None, None)).await;
    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(outcome).await, "Content-Type header must be provided");
}

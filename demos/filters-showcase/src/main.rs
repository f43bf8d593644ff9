//! # Filters Showcase
//!
//! Serves a small application whose controllers are decorated with filters
//! declared on the controller type, on its methods, through meta-annotations
//! and through repeated annotations, plus a selection of built-in filters.
//!
//! ## Usage
//! ```bash
//! cargo run -p filters-showcase -- --port 23023
//! RUST_LOG=werval_runtime=trace cargo run -p filters-showcase
//! ```
//!
//! ## Try it
//! ```bash
//! # Every filter logs its name, in chain order, then X-Werval-Filtered is set
//! curl -i http://127.0.0.1:23023/
//!
//! # Built-in security headers, DNT and content type guard
//! curl -i http://127.0.0.1:23023/secured
//! curl -i -X POST -H 'Content-Type: application/json' -H 'DNT: 1' -d '{}' http://127.0.0.1:23023/api
//! curl -i -X POST -H 'Content-Type: text/xml' -d '<x/>' http://127.0.0.1:23023/api
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use http::Method;
use serde_json::json;
use tracing::info;
use werval_api::filters::builtins::{
    ACCEPT_CONTENT_TYPES, CORS, DNT_META_DATA_KEY, DO_NOT_TRACK, HSTS, NEVER_CACHED,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use werval_api::{
    AnnotationInstance, AnnotationKind, Application, Config, Context, ControllerMethod,
    ControllerType, CurrentContext, Filter, FilterChain, FilterType, Outcome, Route,
};
use werval_http_server::{HttpServer, ServerConfig};
use werval_runtime::ApplicationInstance;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to, overrides werval.http.address
    #[arg(short, long)]
    address: Option<String>,

    /// Port to listen on, overrides werval.http.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Application configuration TOML file merged over the reference one
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

/// Logs its name and delegates
struct Named(&'static str);

#[async_trait]
impl Filter for Named {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> werval_api::Result<Outcome> {
        let discriminator = annotation
            .as_ref()
            .and_then(|annotation| annotation.string("discriminator"));
        info!(filter = self.0, discriminator, "Filtering");
        chain.next(context).await
    }
}

/// Flags the response as filtered
#[derive(Default)]
struct MethodFilterTwo;

#[async_trait]
impl Filter for MethodFilterTwo {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        _annotation: Option<AnnotationInstance>,
    ) -> werval_api::Result<Outcome> {
        info!(filter = "MethodFilterTwo", "Filtering");
        context.response().set_header("X-Werval-Filtered", "true")?;
        chain.next(context).await
    }
}

fn named(name: &'static str) -> FilterType {
    FilterType::with_constructor(name, move || Arc::new(Named(name)) as Arc<dyn Filter>)
}

#[derive(Default)]
struct Filtered;

#[derive(Default)]
struct Showcase;

fn filtered_controller() -> Arc<ControllerType> {
    let controller_annotation_one = AnnotationKind::builder("ControllerAnnotationOne")
        .filter_with([named("ControllerAnnotationOne")])
        .build();
    let controller_annotation_two = AnnotationKind::builder("ControllerAnnotationTwo")
        .annotated(controller_annotation_one.instance())
        .filter_with([named("ControllerAnnotationTwo")])
        .build();
    let method_annotation_one = AnnotationKind::builder("MethodAnnotationOne")
        .filter_with([named("MethodAnnotationOne")])
        .build();
    let method_annotation_two = AnnotationKind::builder("MethodAnnotationTwo")
        .annotated(method_annotation_one.instance())
        .filter_with([named("MethodAnnotationTwo")])
        .repeatable_under("MethodAnnotationTwo.Repeat")
        .build();
    let repeat = AnnotationKind::builder("MethodAnnotationTwo.Repeat").build();

    ControllerType::builder("Filtered")
        .annotated(controller_annotation_two.instance())
        .filter_with([named("ControllerFilterOne"), named("ControllerFilterTwo")])
        .constructor::<Filtered>()
        .method(
            ControllerMethod::builder("filtered")
                .filter_with([
                    named("MethodFilterOne"),
                    FilterType::of::<MethodFilterTwo>("MethodFilterTwo"),
                ])
                .annotated(AnnotationInstance::container(
                    &repeat,
                    vec![
                        method_annotation_two
                            .instance()
                            .with("discriminator", "default"),
                        method_annotation_two
                            .instance()
                            .with("discriminator", "another one"),
                    ],
                ))
                .handler(|_: Arc<Filtered>, _context: Context| async move {
                    CurrentContext::outcomes()?
                        .ok()
                        .as_text_plain()
                        .with_body("Filtered\n")
                        .build()
                }),
        )
        .build()
}

fn showcase_controller() -> Arc<ControllerType> {
    ControllerType::builder("Showcase")
        .annotated(X_FRAME_OPTIONS.instance())
        .annotated(X_XSS_PROTECTION.instance())
        .annotated(HSTS.instance())
        .annotated(CORS.instance())
        .constructor::<Showcase>()
        .method(
            ControllerMethod::builder("secured")
                .annotated(NEVER_CACHED.instance())
                .handler(|_: Arc<Showcase>, context: Context| async move {
                    context
                        .outcomes()
                        .ok()
                        .as_text_plain()
                        .with_body("Secured\n")
                        .build()
                }),
        )
        .method(
            ControllerMethod::builder("api")
                .annotated(DO_NOT_TRACK.instance())
                .annotated(
                    ACCEPT_CONTENT_TYPES
                        .instance()
                        .with("value", vec!["application/json"]),
                )
                .handler(|_: Arc<Showcase>, context: Context| async move {
                    let do_not_track = context.meta_data().bool(DNT_META_DATA_KEY).unwrap_or(false);
                    context
                        .outcomes()
                        .created()
                        .with_json(&json!({
                            "request_id": context.request().identity(),
                            "do_not_track": do_not_track,
                            "modifiers": context.route().modifiers(),
                        }))
                        .build()
                }),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,werval_runtime=debug".into()),
        )
        .init();

    let args = Args::parse();

    let document = match &args.config {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    let config = Config::load(document.as_deref())?;

    let filtered = filtered_controller();
    let showcase = showcase_controller();
    let application = ApplicationInstance::builder()
        .config(config)
        .route(Route::new(Method::GET, "/", &filtered, "filtered")?)
        .route(Route::new(Method::GET, "/secured", &showcase, "secured")?)
        .route(Route::new(Method::POST, "/api", &showcase, "api")?.with_modifiers(["json"]))
        .build()?;

    info!("Routes:\n{}", application.routes());

    let mut server_config = ServerConfig::from_config(application.config())?;
    if let Some(address) = &args.address {
        server_config.bind_address.set_ip(address.parse()?);
    }
    if let Some(port) = args.port {
        server_config.bind_address.set_port(port);
    }
    let server = HttpServer::builder(Arc::clone(&application))
        .config(server_config)
        .build()?;

    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Unable to listen for shutdown signal: {}", err);
            }
        })
        .await?;

    drop(server);
    application.shutdown();
    Ok(())
}

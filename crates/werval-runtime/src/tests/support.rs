//! Shared fixtures

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, Uri};
use parking_lot::Mutex;
use werval_api::{
    AnnotationInstance, Config, Context, Filter, FilterChain, FilterType, Outcome, Request,
    Result,
};

/// Names recorded by filters and controllers, in invocation order
pub(crate) type Events = Arc<Mutex<Vec<String>>>;

pub(crate) fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn recorded(events: &Events) -> Vec<String> {
    events.lock().clone()
}

/// Records its name then delegates
pub(crate) struct Recording {
    name: String,
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
        self.events.lock().push(self.name.clone());
        chain.next(context).await
    }
}

/// Filter type whose instances record `name` into `events`
pub(crate) fn recording(name: &str, events: &Events) -> FilterType {
    let events = Arc::clone(events);
    let recorded_name = name.to_string();
    FilterType::with_constructor(name, move || {
        Arc::new(Recording {
            name: recorded_name.clone(),
            events: Arc::clone(&events),
        }) as Arc<dyn Filter>
    })
}

/// Reference configuration with a small request executor
pub(crate) fn config() -> Config {
    Config::reference()
        .unwrap()
        .with_overrides("[werval.executors.app]\ncount = 2\nthread_name_prefix = \"werval-test\"")
        .unwrap()
}

pub(crate) fn get(path: &str) -> Request {
    Request::builder(Method::GET, path.parse::<Uri>().unwrap()).build()
}

pub(crate) async fn body(outcome: Outcome) -> String {
    String::from_utf8(outcome.into_bytes().await.unwrap().to_vec()).unwrap()
}

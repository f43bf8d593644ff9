//! Controller types and methods
//!
//! A [`ControllerType`] mirrors a controller class: it may extend a base type,
//! implement interface types, carry markers and expose methods. Filters
//! declared on the type hierarchy apply to every method.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use werval_api::controller::{ControllerMethod, ControllerType};
//!
//! #[derive(Default)]
//! struct Greetings;
//!
//! impl Greetings {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Hello {name}")
//!     }
//! }
//!
//! let greetings = ControllerType::builder("Greetings")
//!     .constructor::<Greetings>()
//!     .method(ControllerMethod::builder("hello").handler(
//!         |controller: Arc<Greetings>, context| async move {
//!             let name = context.request().parameter("name").unwrap_or("world").to_string();
//!             context.outcomes().ok().as_text_plain().with_body(controller.greet(&name)).build()
//!         },
//!     ))
//!     .build();
//!
//! assert!(greetings.method("hello").is_some());
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::annotations::{AnnotationInstance, FilterType, Marker};
use crate::{Context, Outcome, Result, WervalError};

/// Type-erased controller instance
pub type ControllerInstance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn() -> ControllerInstance + Send + Sync>;

type MethodHandler =
    Arc<dyn Fn(ControllerInstance, Context) -> BoxFuture<'static, Result<Outcome>> + Send + Sync>;

/// A controller class: hierarchy, markers, constructor and methods
pub struct ControllerType {
    name: String,
    superclass: Option<Arc<ControllerType>>,
    interfaces: Vec<Arc<ControllerType>>,
    markers: Vec<Marker>,
    constructor: Option<Constructor>,
    methods: Vec<Arc<ControllerMethod>>,
}

impl ControllerType {
    pub fn builder(name: impl Into<String>) -> ControllerTypeBuilder {
        ControllerTypeBuilder {
            controller: ControllerType {
                name: name.into(),
                superclass: None,
                interfaces: Vec::new(),
                markers: Vec::new(),
                constructor: None,
                methods: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Arc<ControllerType>> {
        self.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[Arc<ControllerType>] {
        &self.interfaces
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Method declared on this type or inherited from its superclass chain
    pub fn method(&self, name: &str) -> Option<&Arc<ControllerMethod>> {
        self.methods
            .iter()
            .find(|method| method.name() == name)
            .or_else(|| self.superclass.as_ref().and_then(|s| s.method(name)))
    }

    pub fn methods(&self) -> &[Arc<ControllerMethod>] {
        &self.methods
    }

    /// New controller instance
    pub fn new_instance(&self) -> Result<ControllerInstance> {
        self.constructor
            .as_ref()
            .map(|constructor| constructor())
            .ok_or_else(|| WervalError::ControllerInstantiation {
                controller: self.name.clone(),
                reason: "no constructor declared".to_string(),
            })
    }
}

impl fmt::Debug for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerType")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field(
                "interfaces",
                &self.interfaces.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("markers", &self.markers)
            .field(
                "methods",
                &self.methods.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`ControllerType`]
pub struct ControllerTypeBuilder {
    controller: ControllerType,
}

impl ControllerTypeBuilder {
    pub fn extends(mut self, superclass: &Arc<ControllerType>) -> Self {
        self.controller.superclass = Some(Arc::clone(superclass));
        self
    }

    pub fn implements(mut self, interface: &Arc<ControllerType>) -> Self {
        self.controller.interfaces.push(Arc::clone(interface));
        self
    }

    pub fn filter_with(mut self, filters: impl IntoIterator<Item = FilterType>) -> Self {
        self.controller
            .markers
            .push(Marker::FilterWith(filters.into_iter().collect()));
        self
    }

    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.controller.markers.push(Marker::Annotation(annotation));
        self
    }

    /// Instances built with `C::default()`
    pub fn constructor<C>(self) -> Self
    where
        C: Default + Send + Sync + 'static,
    {
        self.constructor_fn(C::default)
    }

    /// Instances built with the given function
    pub fn constructor_fn<C, F>(mut self, constructor: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.controller.constructor =
            Some(Arc::new(move || Arc::new(constructor()) as ControllerInstance));
        self
    }

    pub fn method(mut self, method: Arc<ControllerMethod>) -> Self {
        self.controller.methods.push(method);
        self
    }

    pub fn build(self) -> Arc<ControllerType> {
        Arc::new(self.controller)
    }
}

/// A controller method: markers and the async handler the tail invokes
pub struct ControllerMethod {
    name: String,
    markers: Vec<Marker>,
    handler: MethodHandler,
}

impl ControllerMethod {
    pub fn builder(name: impl Into<String>) -> ControllerMethodBuilder {
        ControllerMethodBuilder {
            name: name.into(),
            markers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Invoke the method on a controller instance
    pub async fn invoke(&self, controller: ControllerInstance, context: Context) -> Result<Outcome> {
        (self.handler)(controller, context).await
    }
}

impl fmt::Debug for ControllerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerMethod")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .finish()
    }
}

/// Builder for [`ControllerMethod`], completed by [`ControllerMethodBuilder::handler`]
pub struct ControllerMethodBuilder {
    name: String,
    markers: Vec<Marker>,
}

impl ControllerMethodBuilder {
    pub fn filter_with(mut self, filters: impl IntoIterator<Item = FilterType>) -> Self {
        self.markers
            .push(Marker::FilterWith(filters.into_iter().collect()));
        self
    }

    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.markers.push(Marker::Annotation(annotation));
        self
    }

    /// Bind the handler; invoking it on an instance that is not a `C` is a
    /// wiring error
    pub fn handler<C, F, Fut>(self, handler: F) -> Arc<ControllerMethod>
    where
        C: Send + Sync + 'static,
        F: Fn(Arc<C>, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome>> + Send + 'static,
    {
        let name = self.name.clone();
        let handler: MethodHandler = Arc::new(move |instance: ControllerInstance, context| {
            match instance.downcast::<C>() {
                Ok(controller) => handler(controller, context).boxed(),
                Err(_) => {
                    let err = WervalError::wiring(format!(
                        "controller method '{name}' invoked on an instance of another type"
                    ));
                    async move { Err(err) }.boxed()
                }
            }
        });
        Arc::new(ControllerMethod {
            name: self.name,
            markers: self.markers,
            handler,
        })
    }
}

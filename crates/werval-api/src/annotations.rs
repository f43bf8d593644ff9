//! Declarative filter associations
//!
//! Filters are attached to controllers and controller methods through
//! *markers*, declared once when the application is assembled:
//!
//! - [`Marker::FilterWith`] associates filter types directly
//! - [`Marker::Annotation`] applies an [`AnnotationInstance`], whose
//!   [`AnnotationKind`] may itself carry markers (meta-annotations)
//!
//! Kinds reference other kinds through `Arc`s, so a kind can only be annotated
//! with kinds built before it and the association graph is acyclic.
//!
//! # Examples
//!
//! ```rust
//! use werval_api::annotations::{AnnotationKind, FilterType};
//! # use werval_api::{Filter, FilterChain, Context, AnnotationInstance, Outcome, Result};
//! # use async_trait::async_trait;
//! # #[derive(Default)]
//! # struct RateLimitFilter;
//! # #[async_trait]
//! # impl Filter for RateLimitFilter {
//! #     async fn filter(&self, chain: FilterChain, context: Context, _: Option<AnnotationInstance>) -> Result<Outcome> {
//! #         chain.next(context).await
//! #     }
//! # }
//!
//! let rate_limit = AnnotationKind::builder("RateLimit")
//!     .filter_with([FilterType::of::<RateLimitFilter>("RateLimit.Filter")])
//!     .build();
//!
//! let strict = rate_limit.instance().with("per_minute", 10);
//! assert_eq!(strict.attribute_as::<u32>("per_minute").unwrap(), Some(10));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::Result;
use crate::filters::Filter;

/// Attribute values of an annotation instance
pub type Attributes = Map<String, Value>;

type FilterConstructor = Arc<dyn Fn() -> Arc<dyn Filter> + Send + Sync>;

/// A named filter implementation
///
/// Instances are obtained per request through the application `Global`: the
/// plugin registry is consulted first, then the constructor. A filter type
/// without constructor that no plugin provides is a wiring error.
#[derive(Clone)]
pub struct FilterType {
    name: Arc<str>,
    constructor: Option<FilterConstructor>,
}

impl FilterType {
    /// Filter type built with `F::default()`
    pub fn of<F>(name: impl Into<Arc<str>>) -> Self
    where
        F: Filter + Default + 'static,
    {
        Self::with_constructor(name, || Arc::new(F::default()) as Arc<dyn Filter>)
    }

    /// Filter type built with the given constructor
    pub fn with_constructor<C>(name: impl Into<Arc<str>>, constructor: C) -> Self
    where
        C: Fn() -> Arc<dyn Filter> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Some(Arc::new(constructor)),
        }
    }

    /// Filter type whose instances must be supplied by a plugin
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// New instance from the constructor, if any
    pub fn instantiate(&self) -> Option<Arc<dyn Filter>> {
        self.constructor.as_ref().map(|constructor| constructor())
    }
}

impl fmt::Debug for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterType")
            .field("name", &self.name)
            .field("constructible", &self.constructor.is_some())
            .finish()
    }
}

impl PartialEq for FilterType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FilterType {}

/// Namespace of an annotation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Application,
    /// Framework-internal kinds, ignored when resolving filters
    Builtin,
}

/// A marker applied to a controller, a method or an annotation kind
#[derive(Debug, Clone)]
pub enum Marker {
    FilterWith(Vec<FilterType>),
    Annotation(AnnotationInstance),
}

/// A declared annotation type
#[derive(Debug)]
pub struct AnnotationKind {
    name: String,
    namespace: Namespace,
    markers: Vec<Marker>,
    repeatable_under: Option<String>,
}

impl AnnotationKind {
    pub fn builder(name: impl Into<String>) -> AnnotationKindBuilder {
        AnnotationKindBuilder {
            kind: AnnotationKind {
                name: name.into(),
                namespace: Namespace::Application,
                markers: Vec::new(),
                repeatable_under: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Markers applied to the kind itself, in declaration order
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Name of the container kind this kind repeats under
    pub fn repeatable_under(&self) -> Option<&str> {
        self.repeatable_under.as_deref()
    }

    /// New instance of this kind without attributes
    pub fn instance(self: &Arc<Self>) -> AnnotationInstance {
        AnnotationInstance::new(self)
    }
}

/// Builder for [`AnnotationKind`]
#[derive(Debug)]
pub struct AnnotationKindBuilder {
    kind: AnnotationKind,
}

impl AnnotationKindBuilder {
    /// Mark the kind as framework-internal
    pub fn builtin(mut self) -> Self {
        self.kind.namespace = Namespace::Builtin;
        self
    }

    /// Associate filter types with the kind
    pub fn filter_with(mut self, filters: impl IntoIterator<Item = FilterType>) -> Self {
        self.kind
            .markers
            .push(Marker::FilterWith(filters.into_iter().collect()));
        self
    }

    /// Annotate the kind with another annotation
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.kind.markers.push(Marker::Annotation(annotation));
        self
    }

    /// Declare that instances of this kind may be grouped in a container
    /// instance of the named kind
    pub fn repeatable_under(mut self, container: impl Into<String>) -> Self {
        self.kind.repeatable_under = Some(container.into());
        self
    }

    pub fn build(self) -> Arc<AnnotationKind> {
        Arc::new(self.kind)
    }
}

/// A use of an annotation kind, carrying its attribute values
///
/// Container instances also carry the `value` array of grouped instances.
#[derive(Clone)]
pub struct AnnotationInstance {
    kind: Arc<AnnotationKind>,
    attributes: Attributes,
    elements: Option<Vec<AnnotationInstance>>,
}

impl AnnotationInstance {
    pub fn new(kind: &Arc<AnnotationKind>) -> Self {
        Self {
            kind: Arc::clone(kind),
            attributes: Attributes::new(),
            elements: None,
        }
    }

    /// Container instance grouping repeated instances
    pub fn container(kind: &Arc<AnnotationKind>, elements: Vec<AnnotationInstance>) -> Self {
        Self {
            kind: Arc::clone(kind),
            attributes: Attributes::new(),
            elements: Some(elements),
        }
    }

    /// Set an attribute value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &Arc<AnnotationKind> {
        &self.kind
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Attribute deserialized as `T`
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.attributes.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// String attribute; `None` when missing, not a string or blank
    pub fn string(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_i64)
    }

    /// String array attribute; a single string is a one element list
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.attributes.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Grouped instances, for container instances
    pub fn elements(&self) -> Option<&[AnnotationInstance]> {
        self.elements.as_deref()
    }
}

impl fmt::Debug for AnnotationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("AnnotationInstance");
        debug
            .field("kind", &self.kind.name())
            .field("attributes", &self.attributes);
        if let Some(elements) = &self.elements {
            debug.field("elements", elements);
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_builder_keeps_declaration_order() {
        let one = AnnotationKind::builder("One").build();
        let two = AnnotationKind::builder("Two")
            .annotated(one.instance())
            .filter_with([FilterType::named("Two.Filter")])
            .build();

        assert_eq!(two.name(), "Two");
        assert_eq!(two.namespace(), Namespace::Application);
        assert!(matches!(two.markers()[0], Marker::Annotation(ref a) if a.name() == "One"));
        assert!(matches!(two.markers()[1], Marker::FilterWith(ref f) if f[0].name() == "Two.Filter"));
    }

    #[test]
    fn test_instance_attributes() {
        let kind = AnnotationKind::builder("Cors").build();
        let instance = kind
            .instance()
            .with("allow_origin", json!(["https://a.example", "https://b.example"]))
            .with("allow_credentials", true)
            .with("blank", "  ")
            .with("max_age", 600);

        assert_eq!(
            instance.string_list("allow_origin"),
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(instance.bool("allow_credentials"), Some(true));
        assert_eq!(instance.string("blank"), None);
        assert_eq!(instance.i64("max_age"), Some(600));
        assert_eq!(instance.attribute_as::<u64>("max_age").unwrap(), Some(600));
        assert!(instance.attribute_as::<u64>("allow_credentials").is_err());
        assert!(instance.elements().is_none());
    }

    #[test]
    fn test_filter_types_without_constructor() {
        let named = FilterType::named("Provided.ByPlugin");
        assert!(named.instantiate().is_none());
        assert_eq!(named, FilterType::named("Provided.ByPlugin"));
    }

    #[test]
    fn test_container_instance() {
        let repeated = AnnotationKind::builder("Tag")
            .repeatable_under("Tags")
            .build();
        let container_kind = AnnotationKind::builder("Tags").build();
        let container = AnnotationInstance::container(
            &container_kind,
            vec![repeated.instance().with("v", "a"), repeated.instance().with("v", "b")],
        );

        let elements = container.elements().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind().repeatable_under(), Some("Tags"));
        assert_eq!(elements[1].string("v"), Some("b"));
    }
}

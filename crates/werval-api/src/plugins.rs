//! Plugin registry
//!
//! Plugins expose their API as a shared value registered by type. Plugins may
//! also provide filter instances by filter type name; those take precedence
//! over the filter type's own constructor.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::filters::Filter;

/// Registry of plugin APIs and plugin-provided filters
///
/// Populated while the application is assembled, read-only afterwards.
#[derive(Default)]
pub struct Plugins {
    apis: HashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin API, replacing any previous one of the same type
    pub fn register<T: Any + Send + Sync>(&mut self, api: T) {
        self.register_arc(Arc::new(api));
    }

    pub fn register_arc<T: Any + Send + Sync>(&mut self, api: Arc<T>) {
        self.apis
            .insert(TypeId::of::<T>(), (std::any::type_name::<T>(), api));
    }

    /// Plugin API of type `T`
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.apis
            .get(&TypeId::of::<T>())
            .and_then(|(_, api)| Arc::clone(api).downcast::<T>().ok())
    }

    pub fn has<T: Any + Send + Sync>(&self) -> bool {
        self.apis.contains_key(&TypeId::of::<T>())
    }

    /// Provide the instance used for the named filter type
    pub fn register_filter(&mut self, filter_type: impl Into<String>, filter: Arc<dyn Filter>) {
        self.filters.insert(filter_type.into(), filter);
    }

    /// Plugin-provided instance for the named filter type
    pub fn filter(&self, filter_type: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(filter_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty() && self.filters.is_empty()
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut apis: Vec<_> = self.apis.values().map(|(name, _)| *name).collect();
        apis.sort_unstable();
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort_unstable();
        f.debug_struct("Plugins")
            .field("apis", &apis)
            .field("filters", &filters)
            .finish()
    }
}

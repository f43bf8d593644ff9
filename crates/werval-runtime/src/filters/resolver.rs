//! Filter resolution
//!
//! Walks the markers declared on a controller type hierarchy and on a
//! controller method and produces the ordered list of filters to run:
//!
//! 1. the superclass chain, most-base first, then implemented interfaces,
//!    each type contributing its own markers after its ancestors
//! 2. the controller type's own markers
//! 3. the controller method's markers
//!
//! `filter_with` markers contribute their filter types without annotation.
//! Annotations contribute the filters associated to their kind, paired with
//! the annotation instance, and recurse into the annotations applied to their
//! kind, depth-first. Container annotations holding repeated elements are
//! unwrapped and each element is resolved on its own. Duplicates are kept.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};
use werval_api::{
    AnnotationInstance, ControllerMethod, ControllerType, FilterDescriptor, Marker, Namespace,
};

type CacheKey = (usize, usize);

struct CacheEntry {
    // Held so the addresses used as key stay valid
    _controller: Arc<ControllerType>,
    _method: Arc<ControllerMethod>,
    descriptors: Arc<[FilterDescriptor]>,
}

/// Resolves and caches the filters of controller methods
#[derive(Default)]
pub struct FilterResolver {
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl FilterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters of a controller method, resolved once then cached
    pub fn resolve(
        &self,
        controller: &Arc<ControllerType>,
        method: &Arc<ControllerMethod>,
    ) -> Arc<[FilterDescriptor]> {
        let key = (
            Arc::as_ptr(controller) as usize,
            Arc::as_ptr(method) as usize,
        );
        if let Some(entry) = self.cache.read().get(&key) {
            return Arc::clone(&entry.descriptors);
        }

        let descriptors: Arc<[FilterDescriptor]> = resolve_filters(controller, method).into();
        debug!(
            controller = controller.name(),
            method = method.name(),
            filters = ?descriptors.iter().map(|d| d.filter().name()).collect::<Vec<_>>(),
            "Resolved filters"
        );
        let mut cache = self.cache.write();
        let entry = cache.entry(key).or_insert_with(|| CacheEntry {
            _controller: Arc::clone(controller),
            _method: Arc::clone(method),
            descriptors,
        });
        Arc::clone(&entry.descriptors)
    }

    /// Number of cached controller methods
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

/// Filters of a controller method, in execution order
pub fn resolve_filters(
    controller: &ControllerType,
    method: &ControllerMethod,
) -> Vec<FilterDescriptor> {
    let mut descriptors = Vec::new();
    filters_on_type(controller, &mut descriptors);
    filters_of_markers(method.markers(), &mut descriptors);
    descriptors
}

fn filters_on_type(controller: &ControllerType, descriptors: &mut Vec<FilterDescriptor>) {
    if let Some(superclass) = controller.superclass() {
        filters_on_type(superclass, descriptors);
    }
    for interface in controller.interfaces() {
        filters_on_type(interface, descriptors);
    }
    filters_of_markers(controller.markers(), descriptors);
}

fn filters_of_markers(markers: &[Marker], descriptors: &mut Vec<FilterDescriptor>) {
    for marker in markers {
        match marker {
            Marker::FilterWith(filters) => descriptors.extend(
                filters
                    .iter()
                    .map(|filter| FilterDescriptor::new(filter.clone(), None)),
            ),
            Marker::Annotation(annotation) => filters_of_annotation(annotation, descriptors),
        }
    }
}

fn filters_of_annotation(annotation: &AnnotationInstance, descriptors: &mut Vec<FilterDescriptor>) {
    if annotation.kind().namespace() == Namespace::Builtin {
        return;
    }

    if let Some(elements) = annotation.elements() {
        let repeated: Vec<&AnnotationInstance> = elements
            .iter()
            .filter(|element| element.kind().repeatable_under() == Some(annotation.name()))
            .collect();
        if !repeated.is_empty() {
            for element in repeated {
                filters_of_annotation(element, descriptors);
            }
            return;
        }
        trace!(
            annotation = annotation.name(),
            "No element repeatable under this annotation, handling it as a meta-annotation"
        );
    }

    for marker in annotation.kind().markers() {
        match marker {
            Marker::FilterWith(filters) => descriptors.extend(
                filters
                    .iter()
                    .map(|filter| FilterDescriptor::new(filter.clone(), Some(annotation.clone()))),
            ),
            Marker::Annotation(inner) => filters_of_annotation(inner, descriptors),
        }
    }
}

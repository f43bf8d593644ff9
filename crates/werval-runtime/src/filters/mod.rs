//! Filter resolution and filter chains

mod chain;
mod resolver;

pub use chain::FilterChainFactory;
pub use resolver::{FilterResolver, resolve_filters};

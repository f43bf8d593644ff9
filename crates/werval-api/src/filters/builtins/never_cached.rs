//! Cache-busting response headers

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use once_cell::sync::Lazy;

use crate::annotations::{AnnotationInstance, AnnotationKind, FilterType};
use crate::http::StatusClass;
use crate::{Context, Filter, FilterChain, Outcome, Result};

pub static NEVER_CACHED: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("NeverCached")
        .filter_with([FilterType::of::<NeverCachedFilter>("NeverCached.Filter")])
        .build()
});

/// Marks outcomes of the selected status classes as never cached
#[derive(Debug, Default)]
pub struct NeverCachedFilter;

#[async_trait]
impl Filter for NeverCachedFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let mut outcome = chain.next(context).await?;

        let classes = match &annotation {
            Some(annotation) => annotation
                .attribute_as::<Vec<StatusClass>>("value")?
                .filter(|classes| !classes.is_empty())
                .unwrap_or_else(|| StatusClass::ALL.to_vec()),
            None => StatusClass::ALL.to_vec(),
        };

        if classes.contains(&StatusClass::of(outcome.status())) {
            let header = outcome.response_header_mut();
            header.insert(CACHE_CONTROL, "no-cache, no-store, max-age=0, must-revalidate")?;
            header.insert(PRAGMA, "no-cache")?;
            header.insert(EXPIRES, "0")?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::builtins::test_chain;
    use crate::test_support::TestApplication;

    #[tokio::test]
    async fn test_every_class_by_default() {
        let context = TestApplication::new().context("/");
        let outcome = NeverCachedFilter
            .filter(test_chain::ok(), context, None)
            .await
            .unwrap();

        let header = outcome.response_header();
        assert_eq!(
            header.header("cache-control"),
            Some("no-cache, no-store, max-age=0, must-revalidate")
        );
        assert_eq!(header.header("pragma"), Some("no-cache"));
        assert_eq!(header.header("expires"), Some("0"));
    }

    #[tokio::test]
    async fn test_selected_classes_only() {
        let context = TestApplication::new().context("/");
        let annotation = NEVER_CACHED.instance().with("value", vec!["client_error"]);

        let outcome = NeverCachedFilter
            .filter(test_chain::ok(), context.clone(), Some(annotation.clone()))
            .await
            .unwrap();
        assert!(outcome.response_header().header("cache-control").is_none());

        let chain = test_chain::answering(|context| context.outcomes().not_found().build());
        let outcome = NeverCachedFilter
            .filter(chain, context, Some(annotation))
            .await
            .unwrap();
        assert_eq!(outcome.response_header().header("pragma"), Some("no-cache"));
    }

    #[tokio::test]
    async fn test_unknown_status_class_is_an_error() {
        let context = TestApplication::new().context("/");
        let annotation = NEVER_CACHED.instance().with("value", vec!["teapot"]);
        let result = NeverCachedFilter
            .filter(test_chain::ok(), context, Some(annotation))
            .await;
        assert!(result.is_err());
    }
}

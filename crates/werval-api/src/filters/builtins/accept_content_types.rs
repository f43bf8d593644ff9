//! Request content type guard

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::annotations::{AnnotationInstance, AnnotationKind, FilterType};
use crate::{Context, Filter, FilterChain, Outcome, Result};

pub static ACCEPT_CONTENT_TYPES: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("AcceptContentTypes")
        .filter_with([FilterType::of::<AcceptContentTypesFilter>(
            "AcceptContentTypes.Filter",
        )])
        .build()
});

/// Answers `400 Bad Request` unless the request MIME type is one of the
/// annotation `value` list
#[derive(Debug, Default)]
pub struct AcceptContentTypesFilter;

#[async_trait]
impl Filter for AcceptContentTypesFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let accepted = annotation
            .map(|annotation| annotation.string_list("value"))
            .unwrap_or_default();

        let Some(mime_type) = context.request().mime_type() else {
            return context
                .outcomes()
                .bad_request()
                .as_text_plain()
                .with_body("Content-Type header must be provided")
                .build();
        };

        if accepted.iter().any(|accepted| accepted.eq_ignore_ascii_case(&mime_type)) {
            return chain.next(context).await;
        }
        tracing::debug!(%mime_type, ?accepted, "Rejecting request content type");
        context
            .outcomes()
            .bad_request()
            .as_text_plain()
            .with_body(format!("Unacceptable content-type: `{mime_type}`"))
            .build()
    }
}

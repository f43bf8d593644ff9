//! Cross-Origin Resource Sharing

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ORIGIN,
};
use once_cell::sync::Lazy;

use crate::annotations::{AnnotationInstance, AnnotationKind, FilterType};
use crate::config::{keys, split_list};
use crate::{Context, Filter, FilterChain, Outcome, Result};

pub static CORS: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("CORS")
        .filter_with([FilterType::of::<CorsFilter>("CORS.Filter")])
        .build()
});

/// Sets CORS headers on the response of requests from allowed origins
///
/// Headers are written to the request response header before delegating, so
/// outcomes built downstream carry them.
#[derive(Debug, Default)]
pub struct CorsFilter;

#[async_trait]
impl Filter for CorsFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        if let Some(origin) = context.request().header(ORIGIN) {
            let config = context.config();
            let allow_origin = match joined(annotation.as_ref(), "allow_origin") {
                Some(joined) => joined,
                None => config.string(keys::FILTERS_CORS_ALLOW_ORIGIN)?,
            };
            let allowed_origins = split_list(&allow_origin);

            if allowed_origins.iter().any(|allowed| allowed == "*" || allowed == origin) {
                let allow_credentials = match &annotation {
                    Some(annotation) => annotation.bool("allow_credentials").unwrap_or(false),
                    None => config.bool(keys::FILTERS_CORS_ALLOW_CREDENTIALS)?,
                } && allow_origin != "*";
                let expose_headers = match joined(annotation.as_ref(), "expose_headers") {
                    Some(joined) => joined,
                    None => config.string(keys::FILTERS_CORS_EXPOSE_HEADERS)?,
                };

                let mut response = context.response();
                response.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin)?;
                response.insert(
                    ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    if allow_credentials { "true" } else { "false" },
                )?;
                if !expose_headers.trim().is_empty() {
                    response.insert(ACCESS_CONTROL_EXPOSE_HEADERS, &expose_headers)?;
                }
            }
        }
        chain.next(context).await
    }
}

/// Comma-joined list attribute, `None` when absent or empty
fn joined(annotation: Option<&AnnotationInstance>, key: &str) -> Option<String> {
    annotation
        .map(|annotation| annotation.string_list(key).join(","))
        .filter(|joined| !joined.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::builtins::test_chain;
    use crate::test_support::TestApplication;
    use crate::Request;
    use http::{Method, Uri};

    fn from_origin(origin: &str) -> Request {
        Request::builder(Method::GET, Uri::from_static("/api"))
            .header("Origin", origin)
            .unwrap()
            .build()
    }

    #[tokio::test]
    async fn test_any_origin_from_config() {
        let context = TestApplication::new().context_for(from_origin("https://app.example"));
        let outcome = CorsFilter
            .filter(test_chain::ok(), context, None)
            .await
            .unwrap();

        let header = outcome.response_header();
        assert_eq!(
            header.header("access-control-allow-origin"),
            Some("https://app.example")
        );
        assert_eq!(header.header("access-control-allow-credentials"), Some("false"));
        assert!(header.header("access-control-expose-headers").is_none());
    }

    #[tokio::test]
    async fn test_listed_origins_with_credentials() {
        let annotation = CORS
            .instance()
            .with("allow_origin", vec!["https://a.example", "https://b.example"])
            .with("allow_credentials", true)
            .with("expose_headers", vec!["X-Total-Count", "X-Page"]);
        let application = TestApplication::new();

        let context = application.context_for(from_origin("https://b.example"));
        let outcome = CorsFilter
            .filter(test_chain::ok(), context, Some(annotation.clone()))
            .await
            .unwrap();
        let header = outcome.response_header();
        assert_eq!(header.header("access-control-allow-credentials"), Some("true"));
        assert_eq!(
            header.header("access-control-expose-headers"),
            Some("X-Total-Count,X-Page")
        );

        let context = application.context_for(from_origin("https://evil.example"));
        let outcome = CorsFilter
            .filter(test_chain::ok(), context, Some(annotation))
            .await
            .unwrap();
        assert!(outcome
            .response_header()
            .header("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_requests_without_origin_are_untouched() {
        let context = TestApplication::new().context("/api");
        let outcome = CorsFilter
            .filter(test_chain::ok(), context, None)
            .await
            .unwrap();
        assert!(outcome.response_header().headers().is_empty());
    }
}

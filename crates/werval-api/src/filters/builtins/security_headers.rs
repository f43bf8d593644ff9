//! Security response headers: X-Frame-Options, X-XSS-Protection and HSTS

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderName;
use http::header::{
    STRICT_TRANSPORT_SECURITY, X_FRAME_OPTIONS as X_FRAME_OPTIONS_HEADER,
    X_XSS_PROTECTION as X_XSS_PROTECTION_HEADER,
};
use once_cell::sync::Lazy;

use crate::annotations::{AnnotationInstance, AnnotationKind, FilterType};
use crate::config::keys;
use crate::{Context, Filter, FilterChain, Outcome, Result};

pub static X_FRAME_OPTIONS: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("XFrameOptions")
        .filter_with([FilterType::of::<XFrameOptionsFilter>("XFrameOptions.Filter")])
        .build()
});

pub static X_XSS_PROTECTION: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("XXSSProtection")
        .filter_with([FilterType::of::<XXssProtectionFilter>("XXSSProtection.Filter")])
        .build()
});

pub static HSTS: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("HSTS")
        .filter_with([FilterType::of::<HstsFilter>("HSTS.Filter")])
        .build()
});

/// Sets `X-Frame-Options` on the outcome
#[derive(Debug, Default)]
pub struct XFrameOptionsFilter;

#[async_trait]
impl Filter for XFrameOptionsFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let outcome = chain.next(context.clone()).await?;
        single_value_header(
            outcome,
            &context,
            annotation.as_ref(),
            X_FRAME_OPTIONS_HEADER,
            keys::FILTERS_X_FRAME_OPTIONS,
        )
    }
}

/// Sets `X-XSS-Protection` on the outcome
#[derive(Debug, Default)]
pub struct XXssProtectionFilter;

#[async_trait]
impl Filter for XXssProtectionFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let outcome = chain.next(context.clone()).await?;
        single_value_header(
            outcome,
            &context,
            annotation.as_ref(),
            X_XSS_PROTECTION_HEADER,
            keys::FILTERS_X_XSS_PROTECTION,
        )
    }
}

fn single_value_header(
    mut outcome: Outcome,
    context: &Context,
    annotation: Option<&AnnotationInstance>,
    header: HeaderName,
    config_key: &str,
) -> Result<Outcome> {
    let value = match annotation.and_then(|a| a.string("value")) {
        Some(value) => value.to_string(),
        None => context.config().string(config_key)?,
    };
    outcome.response_header_mut().insert(header, &value)?;
    Ok(outcome)
}

/// Sets `Strict-Transport-Security` on the outcome
#[derive(Debug, Default)]
pub struct HstsFilter;

#[async_trait]
impl Filter for HstsFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let mut outcome = chain.next(context.clone()).await?;

        let config = context.config().object(keys::FILTERS_HSTS)?;
        let max_age = match annotation.as_ref().and_then(|a| a.i64("max_age")) {
            Some(max_age) if max_age != -1 => max_age.max(0) as u64,
            _ => config.seconds("max_age")?,
        };
        let include_sub_domains = match &annotation {
            Some(annotation) => annotation.bool("include_sub_domains").unwrap_or(false),
            None => config.bool("include_sub_domains")?,
        };

        let mut value = format!("max-age={max_age}");
        if include_sub_domains {
            value.push_str("; includeSubDomains");
        }
        outcome
            .response_header_mut()
            .insert(STRICT_TRANSPORT_SECURITY, &value)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::builtins::test_chain;
    use crate::test_support::TestApplication;

    #[tokio::test]
    async fn test_x_frame_options_from_config_and_annotation() {
        let context = TestApplication::new().context("/");

        let outcome = XFrameOptionsFilter
            .filter(test_chain::ok(), context.clone(), None)
            .await
            .unwrap();
        assert_eq!(outcome.response_header().header("x-frame-options"), Some("DENY"));

        let annotation = X_FRAME_OPTIONS.instance().with("value", "SAMEORIGIN");
        let outcome = XFrameOptionsFilter
            .filter(test_chain::ok(), context.clone(), Some(annotation))
            .await
            .unwrap();
        assert_eq!(
            outcome.response_header().header("x-frame-options"),
            Some("SAMEORIGIN")
        );

        // Blank values fall back to configuration
        let annotation = X_FRAME_OPTIONS.instance().with("value", "");
        let outcome = XFrameOptionsFilter
            .filter(test_chain::ok(), context, Some(annotation))
            .await
            .unwrap();
        assert_eq!(outcome.response_header().header("x-frame-options"), Some("DENY"));
    }

    #[tokio::test]
    async fn test_x_xss_protection() {
        let context = TestApplication::new().context("/");
        let outcome = XXssProtectionFilter
            .filter(test_chain::ok(), context, None)
            .await
            .unwrap();
        assert_eq!(
            outcome.response_header().header("x-xss-protection"),
            Some("1; mode=block")
        );
    }

    #[tokio::test]
    async fn test_hsts() {
        let context = TestApplication::new().context("/");

        let outcome = HstsFilter
            .filter(test_chain::ok(), context.clone(), None)
            .await
            .unwrap();
        assert_eq!(
            outcome.response_header().header("strict-transport-security"),
            Some("max-age=31536000; includeSubDomains")
        );

        let annotation = HSTS.instance().with("max_age", 3600);
        let outcome = HstsFilter
            .filter(test_chain::ok(), context.clone(), Some(annotation))
            .await
            .unwrap();
        assert_eq!(
            outcome.response_header().header("strict-transport-security"),
            Some("max-age=3600")
        );

        let annotation = HSTS
            .instance()
            .with("max_age", -1)
            .with("include_sub_domains", true);
        let outcome = HstsFilter
            .filter(test_chain::ok(), context, Some(annotation))
            .await
            .unwrap();
        assert_eq!(
            outcome.response_header().header("strict-transport-security"),
            Some("max-age=31536000; includeSubDomains")
        );
    }

    #[tokio::test]
    async fn test_headers_are_set_on_short_circuited_outcomes_too() {
        let context = TestApplication::new().context("/");
        let chain = test_chain::answering(|context| context.outcomes().forbidden().build());
        let outcome = XFrameOptionsFilter.filter(chain, context, None).await.unwrap();
        assert_eq!(outcome.status().as_u16(), 403);
        assert_eq!(outcome.response_header().header("x-frame-options"), Some("DENY"));
    }
}

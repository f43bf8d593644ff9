//! Do Not Track support

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::annotations::{AnnotationInstance, AnnotationKind, FilterType};
use crate::config::keys;
use crate::http::names::DNT;
use crate::{Context, Filter, FilterChain, Outcome, Result};

/// MetaData key of the boolean telling whether the client asked not to be tracked
pub const DNT_META_DATA_KEY: &str = "DNT";

pub static DO_NOT_TRACK: Lazy<Arc<AnnotationKind>> = Lazy::new(|| {
    AnnotationKind::builder("DoNotTrack")
        .filter_with([FilterType::of::<DoNotTrackFilter>("DoNotTrack.Filter")])
        .build()
});

/// Exposes the client `DNT` header to downstream filters and the controller,
/// then advertises the tracking policy in the `DNT` response header
#[derive(Debug, Default)]
pub struct DoNotTrackFilter;

#[async_trait]
impl Filter for DoNotTrackFilter {
    async fn filter(
        &self,
        chain: FilterChain,
        context: Context,
        annotation: Option<AnnotationInstance>,
    ) -> Result<Outcome> {
        let do_not_track = context.request().header(DNT) == Some("1");
        context.meta_data().put(DNT_META_DATA_KEY, &do_not_track)?;

        let mut outcome = chain.next(context.clone()).await?;

        let opt_in = match annotation.as_ref().and_then(|a| a.bool("opt_in")) {
            Some(true) => true,
            _ => context.config().bool(keys::FILTERS_DNT_OPT_IN)?,
        };
        outcome
            .response_header_mut()
            .insert(DNT, if opt_in { "0" } else { "1" })?;
        Ok(outcome)
    }
}

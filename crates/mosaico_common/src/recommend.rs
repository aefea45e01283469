//! Track recommendations.
//!
//! An external recommender suggests track ids for a learner's interests. Its
//! answers are filtered against the Track Catalog, and any failure falls back
//! to a static interest-tag filter. Nothing here reads or writes progression
//! state.

use crate::progression::tracks::{TrackCatalog, TrackDefinition};
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Most tracks suggested at once
pub const MAX_RECOMMENDATIONS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Recommender failed: {0}")]
pub struct RecommendError(pub String);

/// External recommendation collaborator
pub trait Recommender: Send + Sync {
    fn recommend(
        &self,
        interests: &[String],
    ) -> impl Future<Output = Result<Vec<String>, RecommendError>> + Send;
}

/// Keep ids that exist in the catalog, first occurrence only, capped at
/// [`MAX_RECOMMENDATIONS`].
pub fn sanitize_recommendations(catalog: &TrackCatalog, ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| catalog.contains(id))
        .filter(|id| seen.insert(id.as_str()))
        .take(MAX_RECOMMENDATIONS)
        .cloned()
        .collect()
}

fn matches_interest(track: &TrackDefinition, interests: &[String]) -> bool {
    interests.iter().any(|interest| {
        let interest = interest.trim();
        track.area.eq_ignore_ascii_case(interest)
            || track.tags.iter().any(|tag| tag.trim().to_lowercase() == interest.to_lowercase())
    })
}

/// Static filter over the catalog by interest tag or area.
///
/// With no interests, or nothing matching, the first catalog tracks are
/// suggested instead.
pub fn fallback_recommendations(catalog: &TrackCatalog, interests: &[String]) -> Vec<String> {
    let matched: Vec<String> = catalog
        .tracks()
        .iter()
        .filter(|t| matches_interest(t, interests))
        .take(MAX_RECOMMENDATIONS)
        .map(|t| t.track_id.clone())
        .collect();

    if !matched.is_empty() {
        return matched;
    }

    catalog
        .tracks()
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|t| t.track_id.clone())
        .collect()
}

/// Ask the recommender, falling back to the static filter on error or when
/// none of its suggestions are usable.
pub async fn recommend_tracks<R: Recommender>(
    recommender: &R,
    catalog: &TrackCatalog,
    interests: &[String],
) -> Vec<String> {
    match recommender.recommend(interests).await {
        Ok(ids) => {
            let usable = sanitize_recommendations(catalog, &ids);
            if usable.is_empty() {
                debug!(suggested = ids.len(), "No usable recommendations, using fallback");
                fallback_recommendations(catalog, interests)
            } else {
                usable
            }
        }
        Err(err) => {
            warn!(error = %err, "Recommender unavailable, using fallback");
            fallback_recommendations(catalog, interests)
        }
    }
}

//! Running planned queries against the search backend.
//!
//! The fetcher never fails. Backend and decoding errors are logged and turned into an
//! empty hit list, and an empty list is a normal outcome callers render as "no results".

use std::{future::Future, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{QueryPlan, RawHit};
use crate::{geo::BoundingBox, providers::BackendError};

/// A single request to the search backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceQuery {
    pub text: String,
    pub limit: usize,
    pub viewbox: Option<BoundingBox>,
}

/// Anything that can answer a free-text place query.
pub trait PlaceSearchBackend: Send + Sync {
    fn search(
        &self,
        query: &PlaceQuery,
    ) -> impl Future<Output = Result<Vec<RawHit>, BackendError>> + Send;
}

impl<T: PlaceSearchBackend> PlaceSearchBackend for Arc<T> {
    fn search(
        &self,
        query: &PlaceQuery,
    ) -> impl Future<Output = Result<Vec<RawHit>, BackendError>> + Send {
        (**self).search(query)
    }
}

/// Result of walking the fallback ladder.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub hits: Vec<RawHit>,
    /// Number of backend calls made
    pub attempts: usize,
    /// The query that produced `hits`, if any did
    pub matched_query: Option<String>,
    /// Whether the matching call was bounded to the box
    pub bounded: bool,
}

pub struct ResultFetcher<B> {
    backend: B,
    unbounded_retry: bool,
}

impl<B: PlaceSearchBackend> ResultFetcher<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            unbounded_retry: true,
        }
    }

    /// Enable or disable the last rung of the ladder (primary query without the box).
    #[must_use]
    pub fn with_unbounded_retry(mut self, enabled: bool) -> Self {
        self.unbounded_retry = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One backend call. Any failure becomes an empty list.
    pub async fn fetch(
        &self,
        query: &str,
        limit: usize,
        geo_box: Option<BoundingBox>,
    ) -> Vec<RawHit> {
        let request = PlaceQuery {
            text: query.to_string(),
            limit,
            viewbox: geo_box,
        };
        match self.backend.search(&request).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query, error = %e, "Place search failed, treating as no results");
                Vec::new()
            }
        }
    }

    /// Walk the ladder and stop at the first non-empty answer:
    ///
    /// 1. primary query, with the box if any
    /// 2. each fallback query in order, with the same box
    /// 3. primary query again without the box (only when step 1 had one)
    ///
    /// At most `1 + fallbacks + 1` calls are made.
    #[instrument(name = "Fetch with fallbacks", level = "debug", skip(self, plan), fields(primary = %plan.primary_query))]
    pub async fn fetch_with_fallbacks(
        &self,
        plan: &QueryPlan,
        limit: usize,
        geo_box: Option<BoundingBox>,
    ) -> FetchOutcome {
        let mut attempts = 0;

        for query in plan.queries() {
            attempts += 1;
            let hits = self.fetch(query, limit, geo_box).await;
            if !hits.is_empty() {
                debug!(query, attempts, hits = hits.len(), "Query matched");
                return FetchOutcome {
                    hits,
                    attempts,
                    matched_query: Some(query.to_string()),
                    bounded: geo_box.is_some(),
                };
            }
            debug!(query, "No hits, moving down the ladder");
        }

        if geo_box.is_some() && self.unbounded_retry {
            attempts += 1;
            let hits = self.fetch(&plan.primary_query, limit, None).await;
            if !hits.is_empty() {
                info!(attempts, "Matched only after dropping the search box");
                return FetchOutcome {
                    hits,
                    attempts,
                    matched_query: Some(plan.primary_query.clone()),
                    bounded: false,
                };
            }
        }

        info!(attempts, "Search ladder exhausted without results");
        FetchOutcome {
            attempts,
            ..FetchOutcome::default()
        }
    }
}

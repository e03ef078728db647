//! Turning raw hits into result cards and merging them into the accumulated list.

use std::cmp::Ordering;

use ahash::AHashSet as HashSet;
use serde::Serialize;
use tracing::{debug, trace};

use super::{HIGHLIGHTS, MergeMode, RawHit, SearchContext, SearchResult, dedup_key};
use crate::geo::{Coordinates, format_distance};

/// Address keys tried in order when describing where a hit is.
const LOCALITY_KEYS: [&str; 5] = ["city", "town", "village", "suburb", "state"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Results actually added to the list
    pub added: usize,
    /// Hits dropped because their name and latitude were already present
    pub duplicates: usize,
    /// Length of the list after the merge
    pub total: usize,
}

/// Enriches hits relative to the user's position for one search context.
#[derive(Debug, Clone, Copy)]
pub struct ResultEnricher {
    user: Option<Coordinates>,
    context: SearchContext,
}

impl ResultEnricher {
    pub fn new(user: Option<Coordinates>, context: SearchContext) -> Self {
        Self { user, context }
    }

    pub fn enrich(&self, hit: RawHit) -> SearchResult {
        let distance = self.user.map(|user| user.distance_km(&hit.coordinates));
        let raw_category = if hit.kind.is_empty() {
            hit.category.clone()
        } else {
            hit.kind.clone()
        };
        let category = humanize(&raw_category);
        let description = match LOCALITY_KEYS.iter().find_map(|k| hit.address.get(*k)) {
            Some(locality) => format!("{category} em {locality}"),
            None => category.clone(),
        };

        SearchResult {
            description,
            address: hit.display_name,
            distance_km: distance.map(format_distance).unwrap_or_default(),
            distance,
            category,
            tags: vec![raw_category, self.context.tag().to_string()],
            highlights: HIGHLIGHTS.iter().map(ToString::to_string).collect(),
            latitude: hit.coordinates.lat,
            longitude: hit.coordinates.lon,
            image: hit.image,
            name: hit.name,
        }
    }

    /// Merge freshly fetched hits into `results`.
    ///
    /// `Fresh` replaces the list, `Append` keeps it and adds only hits whose
    /// name + latitude key is not already present. Proximity contexts are re-sorted by
    /// distance afterwards; other contexts keep backend order.
    pub fn merge(
        &self,
        results: &mut Vec<SearchResult>,
        hits: Vec<RawHit>,
        mode: MergeMode,
    ) -> MergeReport {
        if mode == MergeMode::Fresh {
            results.clear();
        }

        let mut seen: HashSet<String> = results.iter().map(SearchResult::dedup_key).collect();
        let before = results.len();
        let mut duplicates = 0;

        for hit in hits {
            if seen.insert(dedup_key(&hit.name, hit.coordinates.lat)) {
                results.push(self.enrich(hit));
            } else {
                trace!(name = %hit.name, "Dropping duplicate hit");
                duplicates += 1;
            }
        }

        if self.context.is_proximity() {
            sort_by_distance(results);
        }

        let report = MergeReport {
            added: results.len() - before,
            duplicates,
            total: results.len(),
        };
        debug!(?mode, ?report, "Merged search results");
        report
    }
}

/// Stable ascending sort, results without a distance last.
pub fn sort_by_distance(results: &mut [SearchResult]) {
    results.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// `"theme_park"` -> `"Theme park"`
fn humanize(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

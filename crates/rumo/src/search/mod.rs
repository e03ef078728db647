//! Travel search pipeline: plan queries, fetch hits, merge them into the session.
//!
//! Each stage can be used on its own:
//! - [`planner`] turns a topic or free-text query into backend query strings (pure)
//! - [`fetcher`] runs those queries against a [`PlaceSearchBackend`] with a fallback ladder
//! - [`enrichment`] computes distances, tags hits and merges them without duplicates

use std::collections::BTreeMap;

use rumo_catalog::TopicId;
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

pub mod enrichment;
pub mod fetcher;
pub mod planner;

pub use enrichment::{MergeReport, ResultEnricher};
pub use fetcher::{FetchOutcome, PlaceQuery, PlaceSearchBackend, ResultFetcher};
pub use planner::{PlanRequest, QueryPlan, QueryPlanner, SearchInput};

/// A place record as returned by the search backend, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    pub name: String,
    pub display_name: String,
    pub coordinates: Coordinates,
    /// Broad classification, e.g. `tourism` or `amenity`
    pub category: String,
    /// Specific classification, e.g. `museum` or `restaurant`
    pub kind: String,
    #[serde(default)]
    pub address: BTreeMap<String, String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Where a search came from; decides tagging and ordering of its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "topic", rename_all = "snake_case")]
pub enum SearchContext {
    /// The rotating "what's around me" feed
    Nearby,
    /// Free text naming a kind of place, e.g. "pizzaria"
    ManualPlace,
    /// Free text naming a destination, e.g. "Lisboa"
    Destination,
    /// A curated catalog topic
    Topic(TopicId),
}

impl SearchContext {
    /// Results in these contexts are sorted by distance from the user.
    pub fn is_proximity(self) -> bool {
        match self {
            Self::Nearby | Self::ManualPlace => true,
            Self::Destination => false,
            Self::Topic(id) => id.is_proximity(),
        }
    }

    pub fn tag(self) -> &'static str {
        if self.is_proximity() {
            NEARBY_TAG
        } else {
            DESTINATION_TAG
        }
    }
}

pub const NEARBY_TAG: &str = "Perto de você";
pub const DESTINATION_TAG: &str = "Destino Recomendado";
pub const HIGHLIGHTS: [&str; 2] = ["Verificado", "Alta Procura"];

/// Whether a merge starts a new result list or extends the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    Fresh,
    Append,
}

/// An enriched result as shown on a result card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub name: String,
    pub description: String,
    pub address: String,
    /// Display label, e.g. `"3.4 km"`; empty when the user position is unknown
    pub distance_km: String,
    /// Numeric distance backing `distance_km`
    pub distance: Option<f64>,
    pub category: String,
    pub tags: Vec<String>,
    pub highlights: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub image: Option<String>,
}

impl SearchResult {
    /// Identity used for de-duplication: the name followed by the latitude.
    ///
    /// This is intentionally loose. Two hits for the same place with slightly different
    /// names or rounded coordinates are kept as separate results.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.name, self.latitude)
    }
}

pub(crate) fn dedup_key(name: &str, latitude: f64) -> String {
    format!("{name}{latitude}")
}

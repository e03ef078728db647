//! The smart travel agent: one search session from location detection to paginated results.
//!
//! [`SmartTravelAgent`] owns the session state a result screen renders. Each search goes
//! through three steps:
//!
//! 1. [`SmartTravelAgent::begin_search`] plans the queries, flips the loading flags and
//!    hands out a [`SearchTicket`] stamped with a new generation
//! 2. [`SearchTicket::run`] performs the network calls without borrowing the session
//! 3. [`SmartTravelAgent::apply`] merges the response, unless a newer search was issued
//!    in the meantime, in which case the response is dropped as stale
//!
//! [`SmartTravelAgent::search`] and [`SmartTravelAgent::load_more`] chain the three steps
//! for callers that do not share the session across tasks.
//!
//! ```rust,no_run
//! use rumo::{
//!     ClientConfig, Coordinates, FixedPosition, SearchConfig, SearchInput, SmartTravelAgent,
//!     TopicId,
//! };
//!
//! # async fn run() -> Result<(), rumo::error::RumoError> {
//! let position = FixedPosition(Coordinates::new(-23.55, -46.63));
//! let mut agent =
//!     SmartTravelAgent::with_nominatim(position, &ClientConfig::default(), SearchConfig::default())?;
//!
//! let _ = agent.detect_location().await;
//! agent.search(SearchInput::Topic(TopicId::Nearby)).await;
//! agent.load_more().await;
//! println!("{} results", agent.state().results.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{ClientConfig, SearchConfig},
    error::RumoError,
    geo::{BoundingBox, Coordinates},
    location::{
        LocationResolver, LocationUnavailable, PositionSource, ResolvedLocation, ReverseGeocoder,
    },
    providers::NominatimClient,
    search::{
        FetchOutcome, MergeMode, MergeReport, PlaceSearchBackend, PlanRequest, QueryPlan,
        QueryPlanner, ResultEnricher, ResultFetcher, SearchInput, SearchResult,
    },
};

/// Everything a result screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSessionState {
    pub user_location: ResolvedLocation,
    pub results: Vec<SearchResult>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub has_searched: bool,
    pub last_query_term: String,
    pub page: usize,
    pub show_modal: bool,
}

impl Default for SearchSessionState {
    fn default() -> Self {
        Self {
            user_location: ResolvedLocation::default(),
            results: Vec::new(),
            is_loading: false,
            is_loading_more: false,
            has_searched: false,
            last_query_term: String::new(),
            page: 1,
            show_modal: false,
        }
    }
}

/// A planned search waiting to be run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    pub generation: u64,
    pub plan: QueryPlan,
    pub mode: MergeMode,
    /// Page the session moves to once this search is applied
    pub page: usize,
    pub limit: usize,
    pub geo_box: Option<BoundingBox>,
    /// User position at the time of issue, used for distances
    pub user: Option<Coordinates>,
}

impl SearchTicket {
    /// Run the fallback ladder for this ticket.
    pub async fn run<B: PlaceSearchBackend>(self, fetcher: &ResultFetcher<B>) -> SearchResponse {
        let outcome = fetcher
            .fetch_with_fallbacks(&self.plan, self.limit, self.geo_box)
            .await;
        SearchResponse {
            ticket: self,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub ticket: SearchTicket,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(MergeReport),
    /// A newer search was issued after this one; nothing changed
    Stale { generation: u64, latest: u64 },
}

pub type NominatimAgent<P> = SmartTravelAgent<Arc<NominatimClient>, P, Arc<NominatimClient>>;

pub struct SmartTravelAgent<B, P, G> {
    state: SearchSessionState,
    generation: u64,
    last_input: Option<SearchInput>,
    planner: QueryPlanner,
    fetcher: Arc<ResultFetcher<B>>,
    resolver: LocationResolver<P, G>,
    config: SearchConfig,
}

impl<P: PositionSource> NominatimAgent<P> {
    /// Agent backed by a single shared Nominatim client for search and reverse geocoding.
    pub fn with_nominatim(
        position: P,
        client_config: &ClientConfig,
        config: SearchConfig,
    ) -> Result<Self, RumoError> {
        let client = Arc::new(NominatimClient::new(client_config)?);
        Ok(Self::new(Arc::clone(&client), position, client, config))
    }
}

impl<B, P, G> SmartTravelAgent<B, P, G>
where
    B: PlaceSearchBackend,
    P: PositionSource,
    G: ReverseGeocoder,
{
    pub fn new(backend: B, position: P, geocoder: G, config: SearchConfig) -> Self {
        let fetcher = ResultFetcher::new(backend).with_unbounded_retry(config.unbounded_retry);
        Self {
            state: SearchSessionState::default(),
            generation: 0,
            last_input: None,
            planner: QueryPlanner::default(),
            fetcher: Arc::new(fetcher),
            resolver: LocationResolver::new(position, geocoder, config.geolocation_timeout),
            config,
        }
    }

    /// Replace the planner, e.g. one built from custom reference data.
    #[must_use]
    pub fn with_planner(mut self, planner: QueryPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn state(&self) -> &SearchSessionState {
        &self.state
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Shared handle to the fetcher, for running tickets outside the session.
    pub fn fetcher(&self) -> Arc<ResultFetcher<B>> {
        Arc::clone(&self.fetcher)
    }

    /// Generation of the most recently issued search.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the user location wholesale.
    pub fn set_location(&mut self, location: ResolvedLocation) {
        self.state.user_location = location;
    }

    /// Detect and store the user's location.
    ///
    /// When no position can be obtained the stored location becomes the generic fallback
    /// and the error is returned so the caller can tell the user once.
    pub async fn detect_location(&mut self) -> Result<&ResolvedLocation, LocationUnavailable> {
        match self.resolver.detect_location().await {
            Ok(location) => {
                self.state.user_location = location;
                Ok(&self.state.user_location)
            }
            Err(e) => {
                warn!(error = %e, "Falling back to a generic location");
                self.state.user_location = ResolvedLocation::fallback(None);
                Err(e)
            }
        }
    }

    /// Plan a search and mark the session as loading.
    ///
    /// `Fresh` plans `input` for page 1. `Append` ignores `input` and plans the next page
    /// of the last search, and only once that search has been applied. Returns `None` when
    /// there is nothing to search for or a search is still in flight for `Append`.
    #[instrument(level = "debug", skip(self))]
    pub fn begin_search(&mut self, input: SearchInput, mode: MergeMode) -> Option<SearchTicket> {
        let (input, page) = match mode {
            MergeMode::Fresh => (input, 1),
            MergeMode::Append if self.state.is_loading || self.state.is_loading_more => {
                debug!("Search in flight, not loading more");
                return None;
            }
            MergeMode::Append => (self.last_input.clone()?, self.state.page + 1),
        };

        let request = PlanRequest::new(input.clone())
            .location_name(self.state.user_location.place_name())
            .page(page);
        let Some(plan) = self.planner.plan(&request) else {
            debug!("Nothing to search for");
            return None;
        };

        let user = self.state.user_location.coordinates;
        let geo_box = user
            .filter(|_| plan.use_geo_bounding)
            .map(|center| BoundingBox::around(center, self.config.radius_km));

        self.generation += 1;
        match mode {
            MergeMode::Fresh => {
                self.state.is_loading = true;
                self.state.show_modal = true;
            }
            MergeMode::Append => self.state.is_loading_more = true,
        }
        self.state.has_searched = true;
        self.state.last_query_term = input.term();
        self.last_input = Some(input);

        Some(SearchTicket {
            generation: self.generation,
            plan,
            mode,
            page,
            limit: self.config.limit,
            geo_box,
            user,
        })
    }

    /// Merge a finished search into the session, unless it has been superseded.
    pub fn apply(&mut self, response: SearchResponse) -> ApplyOutcome {
        let SearchResponse { ticket, outcome } = response;
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "Discarding stale search response"
            );
            return ApplyOutcome::Stale {
                generation: ticket.generation,
                latest: self.generation,
            };
        }

        let enricher = ResultEnricher::new(ticket.user, ticket.plan.context);
        let report = enricher.merge(&mut self.state.results, outcome.hits, ticket.mode);
        self.state.page = ticket.page;
        self.state.is_loading = false;
        self.state.is_loading_more = false;

        info!(
            page = self.state.page,
            added = report.added,
            total = report.total,
            attempts = outcome.attempts,
            "Search applied"
        );
        ApplyOutcome::Applied(report)
    }

    /// Start a new search, replacing the current results.
    pub async fn search(&mut self, input: SearchInput) -> Option<MergeReport> {
        let ticket = self.begin_search(input, MergeMode::Fresh)?;
        self.run_and_apply(ticket).await
    }

    /// Fetch the next page of the last search and append what is new.
    pub async fn load_more(&mut self) -> Option<MergeReport> {
        let input = self.last_input.clone()?;
        let ticket = self.begin_search(input, MergeMode::Append)?;
        self.run_and_apply(ticket).await
    }

    async fn run_and_apply(&mut self, ticket: SearchTicket) -> Option<MergeReport> {
        let response = ticket.run(&self.fetcher).await;
        match self.apply(response) {
            ApplyOutcome::Applied(report) => Some(report),
            ApplyOutcome::Stale { .. } => None,
        }
    }

    pub fn open_modal(&mut self) {
        self.state.show_modal = true;
    }

    pub fn close_modal(&mut self) {
        self.state.show_modal = false;
    }

    /// Clear results and flags, keeping the user location. In-flight searches become stale.
    pub fn reset(&mut self) {
        let user_location = std::mem::take(&mut self.state.user_location);
        self.state = SearchSessionState {
            user_location,
            ..SearchSessionState::default()
        };
        self.last_input = None;
        self.generation += 1;
    }
}

//! Rumo - Smart Travel Search Orchestration
//!
//! Rumo powers the "smart travel agent" of a travel app. It detects where the user is,
//! turns a chosen topic or free-text query into place-search queries, runs them against
//! an OpenStreetMap Nominatim backend with a fallback ladder, and keeps a paginated,
//! de-duplicated list of result cards annotated with distance and tags.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rumo::{ClientConfig, FixedPosition, Coordinates, SearchConfig, SearchInput, SmartTravelAgent};
//!
//! # async fn run() -> rumo::error::Result<()> {
//! let position = FixedPosition(Coordinates::new(-22.9068, -43.1729));
//! let mut agent = SmartTravelAgent::with_nominatim(
//!     position,
//!     &ClientConfig::from_env()?,
//!     SearchConfig::builder().radius_km(15.0).build(),
//! )?;
//!
//! if agent.detect_location().await.is_err() {
//!     println!("Using a generic location");
//! }
//!
//! // Free text naming a category is searched around the user
//! agent.search(SearchInput::FreeText("restaurantes".into())).await;
//! for result in &agent.state().results {
//!     println!("{} ({})", result.name, result.distance_km);
//! }
//!
//! // Next page, without duplicates
//! agent.load_more().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Topic catalogs**: Embedded inspiration topics and nearby subcategories (see [`rumo_catalog`])
//! - **Query planning**: Rotating hubs and categories per page, keyword detection for free text
//! - **Fallback ladder**: Primary query, fallbacks, then an unbounded retry
//! - **Latest wins**: Responses from superseded searches are discarded
//! - **Concierge**: Trip-planning prompts for a generative text model, tolerant reply parsing
//! - **Wallet**: Balance and transactions behind a [`WalletStore`] boundary
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod concierge;
mod config;
mod core;
pub mod error;
mod geo;
pub mod location;
pub mod providers;
pub mod search;
pub mod wallet;

pub use self::core::{
    ApplyOutcome, NominatimAgent, SearchResponse, SearchSessionState, SearchTicket,
    SmartTravelAgent,
};

pub use concierge::{
    Concierge, ConciergeReply, GeminiClient, TextGenerator, TravelPreferences, TripRequest,
};
pub use config::{ClientConfig, SearchConfig, SearchConfigBuilder};
pub use geo::{BoundingBox, Coordinates, format_distance, haversine_km};
pub use location::{
    FixedPosition, LocationResolver, NoPosition, PositionSource, ResolvedLocation,
    ReverseGeocoder,
};
pub use providers::NominatimClient;
pub use rumo_catalog as catalog;
pub use rumo_catalog::{SearchTopic, TopicId};
pub use search::{MergeMode, PlaceSearchBackend, QueryPlanner, SearchInput, SearchResult};
pub use wallet::{InMemoryWallet, JsonFileWallet, Transaction, WalletStore};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for Rumo.
///
/// Installs a formatted `tracing` subscriber once per process. `RUST_LOG` takes precedence
/// over `level` when set.
///
/// # Examples
///
/// ```rust
/// use rumo::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), rumo::error::RumoError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::RumoError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

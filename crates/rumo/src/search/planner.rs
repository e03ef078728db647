//! Query planning: from what the user picked or typed to backend query strings.
//!
//! Planning is pure. It never touches the network and the same request always yields the
//! same plan, which is what makes the "load more" rotations predictable.

use ahash::AHashSet as HashSet;
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use rumo_catalog::{ReferenceData, TopicId, find_topic_by_label, normalize};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::SearchContext;

static LOCATED_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(?:em|in|perto de|near)\s+\{location\}").expect("valid located clause regex")
});

static LOCATION_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:em|in|near|at|perto de|proximo (?:a|ao|de|do|da)|ao lado de)\s+(\w+)")
        .expect("valid location phrase regex")
});

/// Words after a location preposition that still mean "around me".
const SELF_REFERENCES: [&str; 5] = ["mim", "me", "voce", "you", "aqui"];

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchInput {
    /// A catalog topic picked by id
    Topic(TopicId),
    /// A category label that may or may not name a catalog topic
    Label(String),
    /// Text typed into the search box
    FreeText(String),
}

impl SearchInput {
    /// Human readable term, kept as the session's last query term.
    pub fn term(&self) -> String {
        match self {
            Self::Topic(id) => rumo_catalog::inspiration_topics()
                .get(*id)
                .or_else(|| rumo_catalog::nearby_subcategories().get(*id))
                .map_or_else(|| id.to_string(), |t| t.title.clone()),
            Self::Label(text) | Self::FreeText(text) => text.trim().to_string(),
        }
    }
}

/// Everything the planner needs besides the reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub input: SearchInput,
    /// Name of the user's resolved place, `None` when unknown
    pub location_name: Option<String>,
    /// 1-based page, drives the topic rotations
    pub page: usize,
    /// 1-based month for calendar topics, defaults to the current local month
    pub month: Option<u32>,
}

impl PlanRequest {
    pub fn new(input: SearchInput) -> Self {
        Self {
            input,
            location_name: None,
            page: 1,
            month: None,
        }
    }

    pub fn location_name(mut self, name: Option<&str>) -> Self {
        self.location_name = name.map(ToOwned::to_owned);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }
}

/// Output of planning: what to ask the backend, in which order and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub primary_query: String,
    pub fallback_queries: Vec<String>,
    /// Bound the search to a box around the user
    pub use_geo_bounding: bool,
    pub context: SearchContext,
}

impl QueryPlan {
    /// Primary query followed by the fallbacks, in attempt order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_query.as_str())
            .chain(self.fallback_queries.iter().map(String::as_str))
    }
}

struct TopicTemplate {
    primary: &'static str,
    fallbacks: &'static [&'static str],
}

const fn template(primary: &'static str, fallbacks: &'static [&'static str]) -> TopicTemplate {
    TopicTemplate { primary, fallbacks }
}

/// Search phrases per topic. `{location}`, `{hub}` and `{month}` are substituted at plan time.
fn topic_template(id: TopicId) -> TopicTemplate {
    match id {
        TopicId::Nearby => template("{rotation}", &["Atrações turísticas"]),
        TopicId::ExploreCountry => template(
            "Pontos turísticos em {hub}",
            &["Atrações em {hub}", "{hub}"],
        ),
        TopicId::Beaches => template("Praias em {location}", &["Praia", "Beach"]),
        TopicId::Mountains => template("Mirantes em {location}", &["Serra", "Parque estadual"]),
        TopicId::Gastronomy => template(
            "Restaurantes em {location}",
            &["Mercado municipal", "Restaurante"],
        ),
        TopicId::Culture => template("Museus em {location}", &["Centro histórico", "Teatro"]),
        TopicId::Adventure => template(
            "Trilhas em {location}",
            &["Cachoeira", "Parque nacional"],
        ),
        TopicId::Nature => template(
            "Parques em {location}",
            &["Reserva natural", "Jardim botânico"],
        ),
        TopicId::Nightlife => template("Bares em {location}", &["Casa de shows", "Pub"]),
        TopicId::Romantic => template(
            "Mirantes em {location}",
            &["Restaurante romântico", "Jardim"],
        ),
        TopicId::Family => template("Parques em {location}", &["Zoológico", "Aquário"]),
        TopicId::Shopping => template("Shopping em {location}", &["Feira", "Outlet"]),
        TopicId::Cruises => template("Terminal de cruzeiros", &["Porto", "Cruise terminal"]),
        TopicId::ThemeParks => template("Walt Disney World", &["Disneyland", "Parque temático"]),
        TopicId::BestOfMonth => template(
            "Festival de {month}",
            &["Festa de {month}", "Festival"],
        ),
        TopicId::Festivals => template("Festival", &["Carnaval", "Festa junina"]),
        TopicId::Attractions => template(
            "Pontos turísticos",
            &["Atrações turísticas", "Tourist attraction"],
        ),
        TopicId::Restaurants => template("Restaurantes", &["Restaurante", "Restaurant"]),
        TopicId::Cafes => template("Cafés", &["Padaria", "Cafe"]),
        TopicId::Bars => template("Bares", &["Bar", "Pub"]),
        TopicId::Parks => template("Parques", &["Praça", "Park"]),
        TopicId::Museums => template("Museus", &["Museu", "Museum"]),
        TopicId::Hotels => template("Hotéis", &["Pousada", "Hotel"]),
        TopicId::Malls => template("Shopping", &["Shopping center", "Mall"]),
        TopicId::Other => template("Pontos turísticos em {location}", &["Atrações turísticas"]),
    }
}

/// Maps user input to a [`QueryPlan`].
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    reference: ReferenceData,
    category_keywords: HashSet<String>,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        // The embedded data is validated when it is loaded.
        Self::from_valid(rumo_catalog::reference().clone())
    }
}

impl QueryPlanner {
    /// Build a planner over custom reference data, rejecting empty rotation lists.
    pub fn new(reference: ReferenceData) -> Result<Self> {
        reference.validate()?;
        Ok(Self::from_valid(reference))
    }

    fn from_valid(reference: ReferenceData) -> Self {
        let category_keywords = reference
            .place_category_keywords
            .iter()
            .map(|k| normalize(k))
            .collect();
        Self {
            reference,
            category_keywords,
        }
    }

    /// Plan a search. Returns `None` for blank text input.
    #[instrument(level = "debug", skip(self), fields(page = request.page))]
    pub fn plan(&self, request: &PlanRequest) -> Option<QueryPlan> {
        let plan = match &request.input {
            SearchInput::Topic(id) => self.plan_topic(*id, request),
            SearchInput::Label(label) => match find_topic_by_label(label) {
                Some(topic) if topic.id != TopicId::Other => self.plan_topic(topic.id, request),
                _ => self.plan_free_text(label)?,
            },
            SearchInput::FreeText(text) => self.plan_free_text(text)?,
        };
        debug!(
            primary = %plan.primary_query,
            fallbacks = plan.fallback_queries.len(),
            bounded = plan.use_geo_bounding,
            "Planned search"
        );
        Some(plan)
    }

    /// National hub for a page; pages `k` and `k + hubs.len()` share a hub.
    pub fn hub_for_page(&self, page: usize) -> &str {
        rotate(&self.reference.national_hubs, page)
    }

    /// Nearby category for a page, cycling the same way as the hubs.
    pub fn nearby_category_for_page(&self, page: usize) -> &str {
        rotate(&self.reference.nearby_rotation, page)
    }

    /// Whether the text names a kind of place ("hotel", "museus", ...).
    pub fn has_category_keyword(&self, text: &str) -> bool {
        normalize(text)
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|word| {
                self.category_keywords.contains(word)
                    || word
                        .strip_suffix("es")
                        .is_some_and(|stem| self.category_keywords.contains(stem))
                    || word
                        .strip_suffix('s')
                        .is_some_and(|stem| self.category_keywords.contains(stem))
            })
    }

    fn plan_free_text(&self, text: &str) -> Option<QueryPlan> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if self.has_category_keyword(text) {
            return Some(QueryPlan {
                primary_query: text.to_string(),
                fallback_queries: vec![],
                use_geo_bounding: !has_location_phrase(text),
                context: SearchContext::ManualPlace,
            });
        }

        Some(QueryPlan {
            primary_query: format!("Atrações em {text}"),
            fallback_queries: vec![
                format!("Tourist attractions in {text}"),
                format!("Top sights in {text}"),
                format!("City Center {text}"),
            ],
            use_geo_bounding: false,
            context: SearchContext::Destination,
        })
    }

    fn plan_topic(&self, id: TopicId, request: &PlanRequest) -> QueryPlan {
        let template = topic_template(id);
        let month = request
            .month
            .unwrap_or_else(|| chrono::Local::now().month());
        let render = |phrase: &str| {
            self.render(phrase, request.location_name.as_deref(), request.page, month)
        };

        let context = if id == TopicId::Nearby {
            SearchContext::Nearby
        } else {
            SearchContext::Topic(id)
        };

        QueryPlan {
            primary_query: render(template.primary),
            fallback_queries: template.fallbacks.iter().map(|&f| render(f)).collect(),
            use_geo_bounding: !id.is_global(),
            context,
        }
    }

    fn render(&self, phrase: &str, location: Option<&str>, page: usize, month: u32) -> String {
        let phrase = match location {
            Some(name) => phrase.replace("{location}", name),
            None => LOCATED_CLAUSE.replace_all(phrase, "").into_owned(),
        };
        phrase
            .replace("{hub}", self.hub_for_page(page))
            .replace("{rotation}", self.nearby_category_for_page(page))
            .replace("{month}", self.reference.month_name(month))
    }
}

fn rotate(items: &[String], page: usize) -> &str {
    &items[(page.max(1) - 1) % items.len()]
}

/// Whether free text already says where to look ("hotel em Paris").
fn has_location_phrase(text: &str) -> bool {
    LOCATION_PHRASE
        .captures_iter(&normalize(text))
        .any(|caps| !SELF_REFERENCES.contains(&&caps[1]))
}

//! Topic catalogs used to drive curated searches.
//!
//! A topic is identified by a stable [`TopicId`]. Titles are presentation text and may
//! change between catalog versions, so lookups by title are only offered for callers that
//! still hold a free-text label (see [`TopicCatalog::find_by_label`]).

use std::{fmt, fs, path::Path};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{CatalogError, error::Result, normalize};

/// Stable identifier for every topic the planner knows how to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicId {
    // Inspiration topics
    Nearby,
    ExploreCountry,
    Beaches,
    Mountains,
    Gastronomy,
    Culture,
    Adventure,
    Nature,
    Nightlife,
    Romantic,
    Family,
    Shopping,
    Cruises,
    ThemeParks,
    BestOfMonth,
    Festivals,
    // Nearby subcategories
    Attractions,
    Restaurants,
    Cafes,
    Bars,
    Parks,
    Museums,
    Hotels,
    Malls,
    /// Topic from a custom catalog that has no dedicated search mapping.
    #[serde(other)]
    Other,
}

impl TopicId {
    /// Topics whose searches make no sense inside a box around the user.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            Self::Cruises
                | Self::ThemeParks
                | Self::BestOfMonth
                | Self::Festivals
                | Self::ExploreCountry
        )
    }

    /// Topics whose results are ordered by distance from the user.
    pub fn is_proximity(self) -> bool {
        matches!(
            self,
            Self::Nearby
                | Self::Attractions
                | Self::Restaurants
                | Self::Cafes
                | Self::Bars
                | Self::Parks
                | Self::Museums
                | Self::Hotels
                | Self::Malls
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearby => "nearby",
            Self::ExploreCountry => "explore-country",
            Self::Beaches => "beaches",
            Self::Mountains => "mountains",
            Self::Gastronomy => "gastronomy",
            Self::Culture => "culture",
            Self::Adventure => "adventure",
            Self::Nature => "nature",
            Self::Nightlife => "nightlife",
            Self::Romantic => "romantic",
            Self::Family => "family",
            Self::Shopping => "shopping",
            Self::Cruises => "cruises",
            Self::ThemeParks => "theme-parks",
            Self::BestOfMonth => "best-of-month",
            Self::Festivals => "festivals",
            Self::Attractions => "attractions",
            Self::Restaurants => "restaurants",
            Self::Cafes => "cafes",
            Self::Bars => "bars",
            Self::Parks => "parks",
            Self::Museums => "museums",
            Self::Hotels => "hotels",
            Self::Malls => "malls",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTopic {
    pub id: TopicId,
    pub title: String,
    pub icon: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// How closely a label matches a topic title, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LabelMatch {
    /// Same words as the title
    Exact,
    /// The title starts with the label's words
    Leading,
    /// One side's words appear as a run in the other
    Words,
    /// Substring containment in either direction
    Partial,
}

impl SearchTopic {
    /// Compare a normalized label with the title, ignoring case, accents and plural endings.
    pub fn label_match(&self, normalized_label: &str) -> Option<LabelMatch> {
        let label = words(normalized_label);
        if label.is_empty() {
            return None;
        }
        let title_text = normalize(&self.title);
        let title = words(&title_text);

        if label.len() == title.len() && starts_with_words(&title, &label) {
            Some(LabelMatch::Exact)
        } else if starts_with_words(&title, &label) {
            Some(LabelMatch::Leading)
        } else if contains_words(&title, &label) || contains_words(&label, &title) {
            Some(LabelMatch::Words)
        } else if title_text.contains(normalized_label) || normalized_label.contains(&title_text) {
            Some(LabelMatch::Partial)
        } else {
            None
        }
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// "parque" and "parques", "bar" and "bares" count as the same word.
fn same_word(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.strip_prefix(short)
        .is_some_and(|rest| rest.is_empty() || rest == "s" || rest == "es")
}

fn starts_with_words(haystack: &[&str], needle: &[&str]) -> bool {
    needle.len() <= haystack.len() && haystack.iter().zip(needle).all(|(a, b)| same_word(a, b))
}

fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    (0..haystack.len()).any(|i| starts_with_words(&haystack[i..], needle))
}

/// An ordered, read-only list of topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCatalog {
    topics: Vec<SearchTopic>,
}

impl TopicCatalog {
    /// Build a catalog, rejecting empty lists and repeated ids.
    pub fn new(topics: Vec<SearchTopic>) -> Result<Self> {
        if topics.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        if let Some(dup) = topics
            .iter()
            .map(|t| t.id)
            .filter(|id| *id != TopicId::Other)
            .duplicates()
            .next()
        {
            return Err(CatalogError::DuplicateTopic(dup.to_string()));
        }
        Ok(Self { topics })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let topics: Vec<SearchTopic> = serde_json::from_str(json)?;
        Self::new(topics)
    }

    #[instrument(name = "Load topic catalog", level = "debug")]
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        debug!(topics = catalog.len(), "Loaded topic catalog");
        Ok(catalog)
    }

    pub fn topics(&self) -> &[SearchTopic] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn get(&self, id: TopicId) -> Option<&SearchTopic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Best matching topic for a label, earlier topics winning ties.
    pub fn find_by_label(&self, label: &str) -> Option<&SearchTopic> {
        self.best_label_match(label).map(|(_, topic)| topic)
    }

    /// Like [`Self::find_by_label`], also returning how well the label matched.
    pub fn best_label_match(&self, label: &str) -> Option<(LabelMatch, &SearchTopic)> {
        let label = normalize(label.trim());
        self.topics
            .iter()
            .filter_map(|t| t.label_match(&label).map(|m| (m, t)))
            .min_by_key(|(m, _)| *m)
    }
}

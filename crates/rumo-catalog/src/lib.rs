//! Reference data for the `rumo` travel search library.
//!
//! Two topic catalogs ship embedded in the crate: the "inspiration topics" shown on the
//! discovery screen and the "nearby subcategories" offered around the user's position.
//! Alongside them sit the word lists the query planner needs (place-category keywords,
//! national hub cities, the nearby rotation and month names).
//!
//! ```rust
//! use rumo_catalog::{TopicId, inspiration_topics};
//!
//! let beaches = inspiration_topics().get(TopicId::Beaches).unwrap();
//! assert_eq!(beaches.title, "Praias Paradisíacas");
//! ```

pub mod embedded;
mod error;
mod topics;

pub use embedded::ReferenceData;
pub use error::{CatalogError, Result};
pub use topics::{LabelMatch, SearchTopic, TopicCatalog, TopicId};

pub fn inspiration_topics() -> &'static TopicCatalog {
    &embedded::INSPIRATION_TOPICS
}

pub fn nearby_subcategories() -> &'static TopicCatalog {
    &embedded::NEARBY_SUBCATEGORIES
}

pub fn reference() -> &'static ReferenceData {
    &embedded::REFERENCE
}

/// Resolve a free-text label against both embedded catalogs.
///
/// The closer match wins. On equal matches inspiration topics come first.
pub fn find_topic_by_label(label: &str) -> Option<&'static SearchTopic> {
    let inspiration = inspiration_topics().best_label_match(label);
    let nearby = nearby_subcategories().best_label_match(label);
    match (inspiration, nearby) {
        (Some((a, _)), Some((b, topic))) if b < a => Some(topic),
        (inspiration, nearby) => inspiration.or(nearby).map(|(_, topic)| topic),
    }
}

/// Lowercase and strip the Latin diacritics used in Portuguese and Spanish place names.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

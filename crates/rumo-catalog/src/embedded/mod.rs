//! Reference data compiled into the binary.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CatalogError, TopicCatalog, error::Result};

const INSPIRATION_TOPICS_JSON: &str = include_str!("../../data/inspiration_topics.json");
const NEARBY_SUBCATEGORIES_JSON: &str = include_str!("../../data/nearby_subcategories.json");
const REFERENCE_JSON: &str = include_str!("../../data/reference.json");

/// Word lists the query planner consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    /// Words that mark a free-text query as a search for a kind of place.
    pub place_category_keywords: Vec<String>,
    /// Cities rotated through by the "explore your country" topic.
    pub national_hubs: Vec<String>,
    /// Mixed categories rotated through by the "nearby" topic.
    pub nearby_rotation: Vec<String>,
    /// Month names, January first.
    pub month_names: Vec<String>,
}

impl ReferenceData {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    /// Check the lists the planner rotates through are usable.
    pub fn validate(&self) -> Result<()> {
        if self.place_category_keywords.is_empty() {
            return Err(CatalogError::EmptyReferenceList("place_category_keywords"));
        }
        if self.national_hubs.is_empty() {
            return Err(CatalogError::EmptyReferenceList("national_hubs"));
        }
        if self.nearby_rotation.is_empty() {
            return Err(CatalogError::EmptyReferenceList("nearby_rotation"));
        }
        if self.month_names.len() != 12 {
            return Err(CatalogError::MonthNames(self.month_names.len()));
        }
        Ok(())
    }

    /// Month name for a 1-based month number, wrapping out-of-range values.
    pub fn month_name(&self, month: u32) -> &str {
        let idx = (month.max(1) as usize - 1) % self.month_names.len();
        &self.month_names[idx]
    }
}

pub static INSPIRATION_TOPICS: Lazy<TopicCatalog> = Lazy::new(|| {
    let catalog = TopicCatalog::from_json_str(INSPIRATION_TOPICS_JSON)
        .expect("Embedded inspiration topics should be valid");
    debug!(topics = catalog.len(), "Loaded embedded inspiration topics");
    catalog
});

pub static NEARBY_SUBCATEGORIES: Lazy<TopicCatalog> = Lazy::new(|| {
    let catalog = TopicCatalog::from_json_str(NEARBY_SUBCATEGORIES_JSON)
        .expect("Embedded nearby subcategories should be valid");
    debug!(topics = catalog.len(), "Loaded embedded nearby subcategories");
    catalog
});

pub static REFERENCE: Lazy<ReferenceData> = Lazy::new(|| {
    ReferenceData::from_json_str(REFERENCE_JSON).expect("Embedded reference data should be valid")
});

//! AI trip-planning concierge.
//!
//! Builds a prompt from a [`TripRequest`], sends it to a [`TextGenerator`] and parses the
//! reply. Models are asked for JSON but often wrap it in prose or code fences, so
//! [`parse_reply`] takes the outermost braces and falls back to plain text.

use std::future::Future;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

mod gemini;

pub use gemini::GeminiClient;

/// Shown to the user when the generator cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str =
    "O concierge está indisponível no momento. Tente novamente em instantes.";

#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generator returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Generator returned no text")]
    EmptyResponse,
    #[error("No API key configured for the text generator")]
    MissingApiKey,
    #[error("Destination must not be empty")]
    EmptyDestination,
    #[error("Trip ends ({end}) before it starts ({start})")]
    InvalidDates { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Economy,
    #[default]
    Moderate,
    Luxury,
}

impl Budget {
    pub fn label(self) -> &'static str {
        match self {
            Self::Economy => "econômico",
            Self::Moderate => "moderado",
            Self::Luxury => "luxo",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Relaxed,
    #[default]
    Balanced,
    Intense,
}

impl Pace {
    pub fn label(self) -> &'static str {
        match self {
            Self::Relaxed => "tranquilo",
            Self::Balanced => "equilibrado",
            Self::Intense => "intenso",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPreferences {
    pub budget: Budget,
    pub pace: Pace,
    pub interests: Vec<String>,
    pub travelers: u32,
}

impl Default for TravelPreferences {
    fn default() -> Self {
        Self {
            budget: Budget::default(),
            pace: Pace::default(),
            interests: Vec::new(),
            travelers: 1,
        }
    }
}

impl TravelPreferences {
    /// One line summary embedded in the prompt.
    pub fn summary(&self) -> String {
        let interests = if self.interests.is_empty() {
            "variados".to_string()
        } else {
            self.interests.iter().map(|i| i.trim()).join(", ")
        };
        format!(
            "Viajantes: {}. Orçamento: {}. Ritmo: {}. Interesses: {interests}.",
            self.travelers.max(1),
            self.budget.label(),
            self.pace.label(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub preferences: TravelPreferences,
}

impl TripRequest {
    pub fn new(
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ConciergeError> {
        let destination = destination.into().trim().to_string();
        if destination.is_empty() {
            return Err(ConciergeError::EmptyDestination);
        }
        if end_date < start_date {
            return Err(ConciergeError::InvalidDates {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            destination,
            start_date,
            end_date,
            preferences: TravelPreferences::default(),
        })
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: TravelPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Number of days, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

pub fn build_prompt(request: &TripRequest) -> String {
    format!(
        "Você é um concierge de viagens experiente. Monte um roteiro para {destination}, \
         de {start} a {end} ({days} dias).\n\
         {preferences}\n\
         Responda somente com JSON no formato \
         {{\"intro\": \"texto curto\", \"recommendations\": \
         [{{\"title\": \"...\", \"description\": \"...\", \"day\": 1}}]}}.",
        destination = request.destination,
        start = request.start_date.format("%d/%m/%Y"),
        end = request.end_date.format("%d/%m/%Y"),
        days = request.days(),
        preferences = request.preferences.summary(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ConciergeReply {
    Structured {
        intro: String,
        recommendations: Vec<Recommendation>,
    },
    /// The generator answered, but not with the requested JSON
    Text(String),
    Unavailable { message: String },
}

#[derive(Deserialize)]
struct StructuredReply {
    intro: String,
    #[serde(default)]
    recommendations: Vec<RecommendationReply>,
}

/// Models sometimes list bare strings instead of objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecommendationReply {
    Plain(String),
    Detailed(Recommendation),
}

impl From<RecommendationReply> for Recommendation {
    fn from(reply: RecommendationReply) -> Self {
        match reply {
            RecommendationReply::Plain(title) => Self {
                title,
                description: String::new(),
                day: None,
            },
            RecommendationReply::Detailed(recommendation) => recommendation,
        }
    }
}

/// Parse the JSON object between the first `{` and the last `}`, or keep the raw text.
pub fn parse_reply(text: &str) -> ConciergeReply {
    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return ConciergeReply::Text(text.to_string()),
    };
    match serde_json::from_str::<StructuredReply>(candidate) {
        Ok(reply) => ConciergeReply::Structured {
            intro: reply.intro,
            recommendations: reply.recommendations.into_iter().map_into().collect(),
        },
        Err(e) => {
            debug!(error = %e, "Reply is not the requested JSON, keeping text");
            ConciergeReply::Text(text.to_string())
        }
    }
}

/// A text model that turns a prompt into a completion.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, ConciergeError>> + Send;
}

pub struct Concierge<T> {
    generator: T,
}

impl<T: TextGenerator> Concierge<T> {
    pub fn new(generator: T) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &T {
        &self.generator
    }

    /// Ask for an itinerary. Never fails; generator errors become [`ConciergeReply::Unavailable`].
    #[instrument(name = "Concierge ask", level = "info", skip(self, request), fields(destination = %request.destination, days = request.days()))]
    pub async fn ask(&self, request: &TripRequest) -> ConciergeReply {
        let prompt = build_prompt(request);
        match self.generator.generate(&prompt).await {
            Ok(text) => {
                let reply = parse_reply(&text);
                info!(
                    structured = matches!(reply, ConciergeReply::Structured { .. }),
                    "Concierge replied"
                );
                reply
            }
            Err(e) => {
                warn!(error = %e, "Concierge unavailable");
                ConciergeReply::Unavailable {
                    message: UNAVAILABLE_MESSAGE.to_string(),
                }
            }
        }
    }
}

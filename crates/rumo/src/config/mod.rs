use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{debug, warn};

use crate::error::RumoError;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_USER_AGENT: &str = concat!("rumo/", env!("CARGO_PKG_VERSION"));

/// Tunables for a search session.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Maximum number of hits requested per backend call
    pub limit: usize,
    /// Radius of the box placed around the user for bounded searches
    pub radius_km: f64,
    /// Timeout for the one-shot device position request
    pub geolocation_timeout: Duration,
    /// Retry the primary query without the box when everything bounded came back empty
    pub unbounded_retry: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            radius_km: 25.0,
            geolocation_timeout: Duration::from_secs(8),
            unbounded_retry: true,
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Tight radius for walking-distance results
    pub fn nearby() -> Self {
        let mut builder = Self::new();
        builder.config.radius_km = 10.0;
        builder.config.limit = 15;
        builder
    }

    /// Wide radius and more hits per call, for sparse regions
    pub fn wide() -> Self {
        let mut builder = Self::new();
        builder.config.radius_km = 50.0;
        builder.config.limit = 20;
        builder
    }

    /// Set the maximum number of hits per backend call
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit.max(1);
        self
    }

    /// Set the bounding radius in kilometres (clamped to 0.5..=500)
    pub fn radius_km(mut self, radius_km: f64) -> Self {
        self.config.radius_km = radius_km.clamp(0.5, 500.0);
        self
    }

    pub fn geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.config.geolocation_timeout = timeout;
        self
    }

    /// Enable or disable the final unbounded retry of the primary query
    pub fn unbounded_retry(mut self, enabled: bool) -> Self {
        self.config.unbounded_retry = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }
}

/// Endpoints and credentials for the HTTP collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub nominatim_url: String,
    pub user_agent: String,
    pub accept_language: String,
    /// Applied to every HTTP call when set; search calls have none by default
    pub http_timeout: Option<Duration>,
    pub gemini_url: String,
    pub gemini_model: String,
    pub gemini_api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "pt-BR".to_string(),
            http_timeout: None,
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_key: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `RUMO_*` environment variables.
    pub fn from_env() -> Result<Self, RumoError> {
        let defaults = Self::default();
        let http_timeout = match var("RUMO_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse("RUMO_HTTP_TIMEOUT_SECS", &raw)?)),
            None => defaults.http_timeout,
        };
        Ok(Self {
            nominatim_url: var("RUMO_NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            user_agent: var("RUMO_USER_AGENT").unwrap_or(defaults.user_agent),
            accept_language: var("RUMO_ACCEPT_LANGUAGE").unwrap_or(defaults.accept_language),
            http_timeout,
            gemini_url: var("RUMO_GEMINI_URL").unwrap_or(defaults.gemini_url),
            gemini_model: var("RUMO_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_key: var("RUMO_GEMINI_API_KEY"),
        })
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, RumoError> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .inspect(|_| debug!("{key} set from environment"))
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, RumoError>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        RumoError::ConfigError(format!("Invalid {key} value '{raw}': {e}"))
    })
}

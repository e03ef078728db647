use thiserror::Error;

#[derive(Error, Debug)]
pub enum RumoError {
    #[error("Location error: {0}")]
    Location(#[from] crate::location::LocationUnavailable),
    #[error("Search backend error: {0}")]
    Backend(#[from] crate::providers::BackendError),
    #[error("Concierge error: {0}")]
    Concierge(#[from] crate::concierge::ConciergeError),
    #[error("Wallet error: {0}")]
    Wallet(#[from] crate::wallet::WalletError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] rumo_catalog::CatalogError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RumoError>;

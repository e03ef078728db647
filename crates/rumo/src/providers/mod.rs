//! HTTP clients for the external services the search pipeline talks to.
use thiserror::Error;

pub mod nominatim;

pub use nominatim::NominatimClient;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status code {0}")]
    Status(u16),
    #[error("Backend reported an error: {0}")]
    Remote(String),
}

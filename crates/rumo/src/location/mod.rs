//! Where is the user? Device position plus reverse geocoding.
//!
//! [`LocationResolver::detect_location`] asks a [`PositionSource`] for a one-shot fix and
//! names it with a [`ReverseGeocoder`]. A failed position request is an error the caller
//! reports once; a failed geocode is not, the coordinates are kept under a generic name.

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{geo::Coordinates, providers::BackendError};

/// Name used whenever the user's place could not be named.
pub const FALLBACK_LOCATION_NAME: &str = "Localização Atual";

/// Snapshot of the user's place. Always replaced as a whole, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub name: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
    pub place_types: Vec<String>,
}

impl ResolvedLocation {
    /// Generic location, keeping the coordinates when the device gave us some.
    pub fn fallback(coordinates: Option<Coordinates>) -> Self {
        Self {
            name: FALLBACK_LOCATION_NAME.to_string(),
            country: String::new(),
            coordinates,
            place_types: vec![],
        }
    }

    /// The real place name, if one was resolved.
    pub fn place_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty() && name != FALLBACK_LOCATION_NAME).then_some(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("position request timed out after {0:?}")]
    Timeout(Duration),
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// The device position could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Location unavailable: {0}")]
pub struct LocationUnavailable(#[from] pub PositionError);

/// Source of one-shot device positions.
pub trait PositionSource: Send + Sync {
    fn current_position(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinates, PositionError>> + Send;
}

/// Always reports the same coordinates. Useful for CLIs that take `--lat/--lon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPosition(pub Coordinates);

impl PositionSource for FixedPosition {
    async fn current_position(&self, _timeout: Duration) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

/// A device without geolocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

impl PositionSource for NoPosition {
    async fn current_position(&self, _timeout: Duration) -> Result<Coordinates, PositionError> {
        Err(PositionError::Unsupported)
    }
}

impl<T: PositionSource> PositionSource for Arc<T> {
    fn current_position(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinates, PositionError>> + Send {
        (**self).current_position(timeout)
    }
}

/// What a reverse geocode tells us about a coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseGeocode {
    pub name: String,
    pub country: String,
    pub place_types: Vec<String>,
}

pub trait ReverseGeocoder: Send + Sync {
    fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<ReverseGeocode, BackendError>> + Send;
}

impl<T: ReverseGeocoder> ReverseGeocoder for Arc<T> {
    fn reverse(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<ReverseGeocode, BackendError>> + Send {
        (**self).reverse(coordinates)
    }
}

pub struct LocationResolver<P, G> {
    position: P,
    geocoder: G,
    timeout: Duration,
}

impl<P: PositionSource, G: ReverseGeocoder> LocationResolver<P, G> {
    pub fn new(position: P, geocoder: G, timeout: Duration) -> Self {
        Self {
            position,
            geocoder,
            timeout,
        }
    }

    /// Resolve the user's current place.
    ///
    /// Fails only when no position could be obtained. A geocoding failure yields
    /// [`ResolvedLocation::fallback`] with the coordinates retained.
    #[instrument(name = "Detect location", level = "info", skip(self))]
    pub async fn detect_location(&self) -> Result<ResolvedLocation, LocationUnavailable> {
        let coordinates = tokio::time::timeout(
            self.timeout,
            self.position.current_position(self.timeout),
        )
        .await
        .map_err(|_| PositionError::Timeout(self.timeout))??;
        debug!(%coordinates, "Got device position");

        match self.geocoder.reverse(coordinates).await {
            Ok(geocode) if !geocode.name.trim().is_empty() => {
                info!(name = %geocode.name, country = %geocode.country, "Resolved location");
                Ok(ResolvedLocation {
                    name: geocode.name,
                    country: geocode.country,
                    coordinates: Some(coordinates),
                    place_types: geocode.place_types,
                })
            }
            Ok(geocode) => {
                warn!("Reverse geocode returned no place name");
                Ok(ResolvedLocation {
                    place_types: geocode.place_types,
                    country: geocode.country,
                    ..ResolvedLocation::fallback(Some(coordinates))
                })
            }
            Err(e) => {
                warn!(error = %e, "Reverse geocoding failed, keeping coordinates only");
                Ok(ResolvedLocation::fallback(Some(coordinates)))
            }
        }
    }
}

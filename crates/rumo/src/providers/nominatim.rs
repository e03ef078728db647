//! Nominatim (OpenStreetMap) client for place search and reverse geocoding.

use std::collections::BTreeMap;

use itertools::Itertools;
use reqwest::{Client, header::ACCEPT_LANGUAGE};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use super::BackendError;
use crate::{
    config::ClientConfig,
    error::RumoError,
    geo::Coordinates,
    location::{ReverseGeocode, ReverseGeocoder},
    search::{PlaceQuery, PlaceSearchBackend, RawHit},
};

/// Address keys tried in order when naming a reverse-geocoded point.
const PLACE_NAME_KEYS: [&str; 7] = [
    "city",
    "town",
    "village",
    "municipality",
    "suburb",
    "county",
    "state",
];

/// Address keys that never describe the kind of place.
const NON_TYPE_KEYS: [&str; 4] = ["postcode", "country_code", "house_number", "road"];

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
    accept_language: String,
}

impl NominatimClient {
    pub fn new(config: &ClientConfig) -> Result<Self, RumoError> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
            accept_language: config.accept_language.clone(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = format!("{}/{path}", self.base_url);
        trace!(url, ?params, "Nominatim request");
        let response = self
            .client
            .get(&url)
            .query(params)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }
}

impl PlaceSearchBackend for NominatimClient {
    #[instrument(name = "Nominatim search", level = "debug", skip(self), fields(q = %query.text))]
    async fn search(&self, query: &PlaceQuery) -> Result<Vec<RawHit>, BackendError> {
        let mut params = vec![
            ("q", query.text.clone()),
            ("format", "jsonv2".to_string()),
            ("limit", query.limit.to_string()),
            ("addressdetails", "1".to_string()),
            ("extratags", "1".to_string()),
        ];
        if let Some(bbox) = query.viewbox {
            params.push(("viewbox", bbox.to_viewbox()));
            params.push(("bounded", "1".to_string()));
        }

        let places: Vec<NominatimPlace> = self.get("search", &params).await?;
        let hits = hits_from_places(places);
        debug!(hits = hits.len(), "Nominatim search complete");
        Ok(hits)
    }
}

impl ReverseGeocoder for NominatimClient {
    #[instrument(name = "Nominatim reverse", level = "debug", skip(self))]
    async fn reverse(&self, coordinates: Coordinates) -> Result<ReverseGeocode, BackendError> {
        let params = [
            ("lat", coordinates.lat.to_string()),
            ("lon", coordinates.lon.to_string()),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        match self.get::<ReverseResponse>("reverse", &params).await? {
            ReverseResponse::Error { error } => Err(BackendError::Remote(error)),
            ReverseResponse::Place(place) => Ok(place.into_reverse_geocode()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Error { error: String },
    Place(NominatimPlace),
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    category: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    addresstype: String,
    #[serde(default)]
    address: BTreeMap<String, String>,
    #[serde(default)]
    extratags: Option<BTreeMap<String, String>>,
}

impl NominatimPlace {
    fn into_hit(self) -> Option<RawHit> {
        let coordinates = Coordinates::new(self.lat.parse().ok()?, self.lon.parse().ok()?);
        let name = if self.name.trim().is_empty() {
            self.display_name.split(',').next()?.trim().to_string()
        } else {
            self.name
        };
        if name.is_empty() {
            return None;
        }
        let image = self.extratags.as_ref().and_then(image_from_extratags);
        Some(RawHit {
            name,
            display_name: self.display_name,
            coordinates,
            category: self.category,
            kind: self.kind,
            address: self.address,
            image,
        })
    }

    fn into_reverse_geocode(self) -> ReverseGeocode {
        let name = PLACE_NAME_KEYS
            .iter()
            .find_map(|key| self.address.get(*key))
            .cloned()
            .unwrap_or(self.name);
        let country = self.address.get("country").cloned().unwrap_or_default();
        let place_types = [&self.category, &self.kind, &self.addresstype]
            .into_iter()
            .cloned()
            .chain(
                self.address
                    .keys()
                    .filter(|k| !NON_TYPE_KEYS.contains(&k.as_str()) && !k.starts_with("ISO"))
                    .cloned(),
            )
            .filter(|t| !t.is_empty())
            .unique()
            .collect();
        ReverseGeocode {
            name,
            country,
            place_types,
        }
    }
}

fn hits_from_places(places: Vec<NominatimPlace>) -> Vec<RawHit> {
    places.into_iter().filter_map(NominatimPlace::into_hit).collect()
}

/// Direct image URL from OSM `image` or `wikimedia_commons` tags.
fn image_from_extratags(tags: &BTreeMap<String, String>) -> Option<String> {
    if let Some(url) = tags.get("image").filter(|u| u.starts_with("http")) {
        return Some(url.clone());
    }
    tags.get("wikimedia_commons")
        .and_then(|file| file.strip_prefix("File:"))
        .map(|file| {
            format!(
                "https://commons.wikimedia.org/wiki/Special:FilePath/{}",
                file.replace(' ', "_")
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_FIXTURE: &str = r#"[
        {
            "place_id": 1, "lat": "-23.5614", "lon": "-46.6559",
            "category": "tourism", "type": "museum", "addresstype": "tourism",
            "name": "Museu de Arte de São Paulo",
            "display_name": "Museu de Arte de São Paulo, Avenida Paulista, São Paulo, Brasil",
            "address": {"road": "Avenida Paulista", "city": "São Paulo"},
            "extratags": {"wikimedia_commons": "File:MASP Paulista.jpg"}
        },
        {
            "place_id": 2, "lat": "-23.5874", "lon": "-46.6576",
            "category": "leisure", "type": "park",
            "name": "",
            "display_name": "Parque Ibirapuera, Vila Mariana, São Paulo",
            "extratags": null
        },
        {
            "place_id": 3, "lat": "not-a-number", "lon": "-46.0",
            "name": "Broken"
        }
    ]"#;

    #[test]
    fn test_search_response_to_hits() {
        let places: Vec<NominatimPlace> = serde_json::from_str(SEARCH_FIXTURE).unwrap();
        let hits = hits_from_places(places);

        assert_eq!(hits.len(), 2, "unparsable coordinates are skipped");
        assert_eq!(hits[0].name, "Museu de Arte de São Paulo");
        assert_eq!(hits[0].kind, "museum");
        assert_eq!(hits[0].coordinates, Coordinates::new(-23.5614, -46.6559));
        assert_eq!(
            hits[0].image.as_deref(),
            Some("https://commons.wikimedia.org/wiki/Special:FilePath/MASP_Paulista.jpg")
        );
        assert_eq!(hits[1].name, "Parque Ibirapuera", "name falls back to display name");
        assert!(hits[1].image.is_none());
    }

    #[test]
    fn test_reverse_response() {
        let json = r#"{
            "lat": "-23.55", "lon": "-46.63",
            "category": "place", "type": "suburb", "addresstype": "suburb",
            "name": "Sé",
            "display_name": "Sé, São Paulo, Brasil",
            "address": {
                "suburb": "Sé", "city": "São Paulo", "state": "São Paulo",
                "ISO3166-2-lvl4": "BR-SP", "country": "Brasil",
                "country_code": "br", "postcode": "01001-000"
            }
        }"#;
        let ReverseResponse::Place(place) = serde_json::from_str::<ReverseResponse>(json).unwrap() else {
            panic!("expected a place");
        };
        let geocode = place.into_reverse_geocode();
        assert_eq!(geocode.name, "São Paulo");
        assert_eq!(geocode.country, "Brasil");
        assert_eq!(geocode.place_types, vec!["place", "suburb", "city", "country", "state"]);
    }

    #[test]
    fn test_reverse_error_response() {
        let response: ReverseResponse =
            serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert!(matches!(response, ReverseResponse::Error { error } if error == "Unable to geocode"));
    }

    #[test]
    fn test_image_prefers_direct_url() {
        let tags = BTreeMap::from([
            ("image".to_string(), "https://example.org/a.jpg".to_string()),
            ("wikimedia_commons".to_string(), "File:B.jpg".to_string()),
        ]);
        assert_eq!(
            image_from_extratags(&tags).as_deref(),
            Some("https://example.org/a.jpg")
        );
        let tags = BTreeMap::from([("wikimedia_commons".to_string(), "Category:X".to_string())]);
        assert!(image_from_extratags(&tags).is_none());
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = ClientConfig {
            nominatim_url: "http://localhost:8080/".to_string(),
            ..ClientConfig::default()
        };
        let client = NominatimClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}

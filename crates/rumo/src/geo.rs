//! Small geographic helpers: coordinates, great-circle distance and search boxes.

use std::fmt;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;
/// Kilometres per degree of latitude, the flat-earth approximation used for search boxes.
const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(*self, *other)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Render a distance the way result cards show it, e.g. `"3.4 km"`.
pub fn format_distance(km: f64) -> String {
    format!("{km:.1} km")
}

/// Axis-aligned box used to bound a place search around a centre point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Box of `radius_km` around `center`, converted to degrees with
    /// `dLat = r / 111` and `dLon = r / (111 * cos(lat))`.
    pub fn around(center: Coordinates, radius_km: f64) -> Self {
        let d_lat = radius_km / KM_PER_DEGREE;
        let d_lon = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos());
        Self {
            min_lon: center.lon - d_lon,
            min_lat: center.lat - d_lat,
            max_lon: center.lon + d_lon,
            max_lat: center.lat + d_lat,
        }
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    /// Nominatim `viewbox` value: `left,top,right,bottom`.
    pub fn to_viewbox(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.max_lat, self.max_lon, self.min_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // São Paulo (Sé) to Rio de Janeiro (Centro), roughly 360 km
        let sp = Coordinates::new(-23.5505, -46.6333);
        let rio = Coordinates::new(-22.9068, -43.1729);
        let d = haversine_km(sp, rio);
        assert!((d - 360.7).abs() < 2.0, "got {d}");
    }

    #[test]
    fn test_haversine_zero_and_symmetric() {
        let a = Coordinates::new(48.8566, 2.3522);
        let b = Coordinates::new(51.5074, -0.1278);
        assert!(haversine_km(a, a).abs() < 1e-9);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0.0 km");
        assert_eq!(format_distance(3.46), "3.5 km");
        assert_eq!(format_distance(12.0), "12.0 km");
    }

    #[test]
    fn test_bounding_box_around() {
        let center = Coordinates::new(-23.55, -46.63);
        let bbox = BoundingBox::around(center, 25.0);

        let d_lat = 25.0 / 111.0;
        assert!((bbox.max_lat - bbox.min_lat - 2.0 * d_lat).abs() < 1e-9);
        // Longitude span widens away from the equator
        assert!(bbox.max_lon - bbox.min_lon > bbox.max_lat - bbox.min_lat);
        assert!(bbox.contains(center));
        assert!(!bbox.contains(Coordinates::new(-22.9, -43.17)));
    }

    #[test]
    fn test_viewbox_order() {
        let bbox = BoundingBox {
            min_lon: -47.0,
            min_lat: -24.0,
            max_lon: -46.0,
            max_lat: -23.0,
        };
        assert_eq!(bbox.to_viewbox(), "-47,-23,-46,-24");
    }
}

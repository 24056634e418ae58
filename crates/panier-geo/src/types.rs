use std::collections::HashMap;

use panier_core::StoreLocation;
use serde::{Deserialize, Serialize};

use crate::distance::haversine_km;
use crate::error::GeoError;

/// Largest accepted search radius.
pub const MAX_RADIUS_KM: f64 = 50.0;

const UNKNOWN_STORE_NAME: &str = "Inconnu";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidRequest`] for out-of-range or non-finite
    /// values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidRequest(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidRequest(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Where a nearby-store search is centred.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoOrigin {
    /// Free-text address, geocoded first.
    Address(String),
    Coordinates(Coordinates),
}

/// One hit of a Nominatim `/search?format=json` response.
///
/// Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
pub(crate) struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
}

impl NominatimPlace {
    pub(crate) fn coordinates(&self) -> Option<Coordinates> {
        let latitude = self.lat.trim().parse().ok()?;
        let longitude = self.lon.trim().parse().ok()?;
        Coordinates::new(latitude, longitude).ok()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverpassElement {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl OverpassElement {
    /// Builds a [`StoreLocation`] with its distance from `origin`. Elements
    /// without coordinates yield `None`.
    pub(crate) fn into_store_location(self, origin: Coordinates) -> Option<StoreLocation> {
        let (latitude, longitude) = (self.lat?, self.lon?);
        let tag = |key: &str| {
            self.tags
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let address = [tag("addr:street"), tag("addr:postcode"), tag("addr:city")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Some(StoreLocation {
            name: tag("name").unwrap_or(UNKNOWN_STORE_NAME).to_owned(),
            brand: tag("brand").unwrap_or_default().to_owned(),
            latitude,
            longitude,
            address,
            is_opened: tag("opening_hours")
                .filter(|hours| *hours == "24/7")
                .map(|_| true),
            distance_km: Some(haversine_km(
                origin.latitude,
                origin.longitude,
                latitude,
                longitude,
            )),
        })
    }
}

/// Overpass QL selecting supermarkets, convenience stores and drive-through
/// pickup points within `radius_km` of `origin`.
#[must_use]
pub fn overpass_query(origin: Coordinates, radius_km: f64) -> String {
    let around = format!(
        "(around:{},{},{})",
        radius_km * 1000.0,
        origin.latitude,
        origin.longitude
    );
    format!(
        "[out:json][timeout:25];\n(\n  node[\"shop\"=\"supermarket\"]{around};\n  node[\"shop\"=\"convenience\"]{around};\n  node[\"drive_through\"=\"yes\"]{around};\n);\nout body;"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Coordinates = Coordinates {
        latitude: 48.8722,
        longitude: 2.0931,
    };

    fn element(json: serde_json::Value) -> OverpassElement {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn element_with_full_tags() {
        let store = element(serde_json::json!({
            "type": "node",
            "id": 1,
            "lat": 48.8741,
            "lon": 2.0967,
            "tags": {
                "name": "Carrefour City",
                "brand": "Carrefour City",
                "shop": "convenience",
                "addr:street": "Rue de Paris",
                "addr:postcode": "78560",
                "addr:city": "Le Port-Marly",
                "opening_hours": "24/7"
            }
        }))
        .into_store_location(ORIGIN)
        .unwrap();

        assert_eq!(store.name, "Carrefour City");
        assert_eq!(store.address, "Rue de Paris, 78560, Le Port-Marly");
        assert_eq!(store.is_opened, Some(true));
        let d = store.distance_km.unwrap();
        assert!(d > 0.0 && d < 1.0, "got {d}");
    }

    #[test]
    fn missing_tags_use_defaults() {
        let store = element(serde_json::json!({"lat": 48.87, "lon": 2.09}))
            .into_store_location(ORIGIN)
            .unwrap();
        assert_eq!(store.name, "Inconnu");
        assert_eq!(store.brand, "");
        assert_eq!(store.address, "");
        assert_eq!(store.is_opened, None);
    }

    #[test]
    fn partial_address_skips_missing_parts() {
        let store = element(serde_json::json!({
            "lat": 48.87,
            "lon": 2.09,
            "tags": {"addr:city": "Marly-le-Roi", "addr:street": " ", "opening_hours": "Mo-Sa 08:30-20:00"}
        }))
        .into_store_location(ORIGIN)
        .unwrap();
        assert_eq!(store.address, "Marly-le-Roi");
        assert_eq!(store.is_opened, None);
    }

    #[test]
    fn element_without_coordinates_is_skipped() {
        let element = element(serde_json::json!({"type": "way", "tags": {"name": "Monoprix"}}));
        assert!(element.into_store_location(ORIGIN).is_none());
    }

    #[test]
    fn nominatim_coordinates_parse_from_strings() {
        let place: NominatimPlace =
            serde_json::from_str(r#"{"lat":"48.8722","lon":"2.0931","display_name":"Le Port-Marly"}"#)
                .unwrap();
        assert_eq!(place.coordinates(), Some(ORIGIN));
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -181.0).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn overpass_query_uses_metres() {
        let query = overpass_query(ORIGIN, 2.5);
        assert!(query.contains(r#"node["shop"="supermarket"](around:2500,48.8722,2.0931);"#));
        assert!(query.contains(r#"node["drive_through"="yes"]"#));
        assert!(query.ends_with("out body;"));
    }
}

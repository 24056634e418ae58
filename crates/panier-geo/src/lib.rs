//! Nearby-store lookup: address geocoding plus a supermarket search around a
//! point, over OpenStreetMap-compatible providers.

pub mod client;
pub mod distance;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{GeoClient, GeoEndpoints};
pub use distance::haversine_km;
pub use error::GeoError;
pub use types::{Coordinates, GeoOrigin, MAX_RADIUS_KM};

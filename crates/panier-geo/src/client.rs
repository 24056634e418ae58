//! HTTP client for the geocoding and nearby-store providers.
//!
//! Every call goes through [`retry_with_backoff`] against one endpoint at a
//! time; when an endpoint gives up, the next configured one is tried.

use std::future::Future;
use std::time::Duration;

use panier_core::{AppConfig, StoreLocation};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::GeoError;
use crate::retry::retry_with_backoff;
use crate::types::{
    overpass_query, Coordinates, GeoOrigin, NominatimPlace, OverpassResponse, MAX_RADIUS_KM,
};

const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_OVERPASS_URLS: [&str; 2] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];

/// Provider base URLs, primary first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoEndpoints {
    /// Nominatim-compatible bases; `/search` is appended.
    pub geocoder: Vec<String>,
    /// Full Overpass interpreter URLs.
    pub overpass: Vec<String>,
}

impl Default for GeoEndpoints {
    fn default() -> Self {
        Self {
            geocoder: vec![DEFAULT_GEOCODER_URL.to_owned()],
            overpass: DEFAULT_OVERPASS_URLS.iter().map(|u| (*u).to_owned()).collect(),
        }
    }
}

/// Finds supermarkets around an address or a point.
#[derive(Debug, Clone)]
pub struct GeoClient {
    client: Client,
    endpoints: GeoEndpoints,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GeoClient {
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidRequest`] when either endpoint list is
    /// empty and [`GeoError::Http`] if the HTTP client cannot be built.
    pub fn new(
        endpoints: GeoEndpoints,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, GeoError> {
        if endpoints.geocoder.is_empty() || endpoints.overpass.is_empty() {
            return Err(GeoError::InvalidRequest(
                "at least one geocoder and one overpass endpoint are required".to_owned(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoints: GeoEndpoints {
                geocoder: trim_slashes(endpoints.geocoder),
                overpass: trim_slashes(endpoints.overpass),
            },
            max_retries,
            backoff_base_ms,
        })
    }

    /// # Errors
    ///
    /// Same as [`GeoClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, GeoError> {
        Self::new(
            GeoEndpoints {
                geocoder: config.geocoder_urls.clone(),
                overpass: config.overpass_urls.clone(),
            },
            config.geo_timeout_secs,
            &config.geo_user_agent,
            config.geo_max_retries,
            config.geo_backoff_base_ms,
        )
    }

    /// Resolves a free-text address to the coordinates of its best match.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InvalidRequest`] for a blank address.
    /// - [`GeoError::AddressNotFound`] when the geocoder has no match.
    /// - Any transport or payload error once every endpoint has failed.
    pub async fn geocode(&self, address: &str) -> Result<Coordinates, GeoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeoError::InvalidRequest("address is empty".to_owned()));
        }

        self.with_fallback(&self.endpoints.geocoder, |base| async move {
            let url = format!("{base}/search");
            let places: Vec<NominatimPlace> = self
                .get_json(
                    &url,
                    &[("format", "json"), ("limit", "1"), ("q", address)],
                )
                .await?;

            let place = places
                .first()
                .ok_or_else(|| GeoError::AddressNotFound(address.to_owned()))?;
            let coordinates = place.coordinates().ok_or_else(|| GeoError::MalformedResponse {
                url: url.clone(),
                reason: format!("unusable coordinates {:?}/{:?}", place.lat, place.lon),
            })?;
            tracing::debug!(address, resolved = %place.display_name, "address geocoded");
            Ok::<_, GeoError>(coordinates)
        })
        .await
    }

    /// Lists supermarkets within `radius_km` of `origin`, nearest first.
    ///
    /// # Errors
    ///
    /// - [`GeoError::InvalidRequest`] when `radius_km` is not in `(0, 50]`
    ///   or the coordinates are out of range.
    /// - Any [`geocode`](Self::geocode) error for an address origin.
    /// - Any transport or payload error once every endpoint has failed.
    pub async fn find_supermarkets(
        &self,
        origin: &GeoOrigin,
        radius_km: f64,
    ) -> Result<Vec<StoreLocation>, GeoError> {
        if !(radius_km > 0.0 && radius_km <= MAX_RADIUS_KM) {
            return Err(GeoError::InvalidRequest(format!(
                "radius must be in (0, {MAX_RADIUS_KM}] km, got {radius_km}"
            )));
        }

        let center = match origin {
            GeoOrigin::Address(address) => self.geocode(address).await?,
            GeoOrigin::Coordinates(c) => Coordinates::new(c.latitude, c.longitude)?,
        };
        let query = overpass_query(center, radius_km);

        let mut stores = self
            .with_fallback(&self.endpoints.overpass, |url| {
                let query = query.as_str();
                async move {
                    let response: OverpassResponse =
                        self.get_json(&url, &[("data", query)]).await?;
                    Ok::<_, GeoError>(response
                        .elements
                        .into_iter()
                        .filter_map(|e| e.into_store_location(center))
                        .collect::<Vec<_>>())
                }
            })
            .await?;

        stores.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::MAX)
                .total_cmp(&b.distance_km.unwrap_or(f64::MAX))
        });
        tracing::info!(
            count = stores.len(),
            radius_km,
            latitude = center.latitude,
            longitude = center.longitude,
            "nearby stores found"
        );
        Ok(stores)
    }

    /// Runs `call` against each endpoint in turn, with retries, until one
    /// succeeds. Returns the last error when all fail.
    async fn with_fallback<T, F, Fut>(
        &self,
        endpoints: &[String],
        mut call: F,
    ) -> Result<T, GeoError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, GeoError>>,
    {
        let mut last_error = None;
        for (index, endpoint) in endpoints.iter().enumerate() {
            let result = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                call(endpoint.clone())
            })
            .await;

            match result {
                Ok(value) => return Ok(value),
                Err(e) if !e.allows_fallback() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        remaining = endpoints.len() - index - 1,
                        error = %e,
                        "geo provider failed"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| GeoError::InvalidRequest("no endpoint configured".to_owned())))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GeoError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await.map_err(|e| transport_error(url, e))?;
        if body.trim().is_empty() {
            return Err(GeoError::EmptyResponse {
                url: url.to_owned(),
            });
        }

        serde_json::from_str(&body).map_err(|e| GeoError::MalformedResponse {
            url: url.to_owned(),
            reason: e.to_string(),
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> GeoError {
    if e.is_timeout() {
        GeoError::Timeout {
            url: url.to_owned(),
        }
    } else {
        GeoError::Http(e)
    }
}

fn trim_slashes(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .map(|u| u.trim_end_matches('/').to_owned())
        .collect()
}

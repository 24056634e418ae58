use axum::{extract::State, Extension, Json};
use panier_core::{ItemQuery, ItemResult, StoreId, StoreLocation};
use panier_geo::{Coordinates, GeoOrigin};
use panier_scraper::{BatchSummary, StoreBatch};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{estimation::validate_items, map_geo_error, ApiError, ApiResponse, AppState};

const DEFAULT_RADIUS_KM: f64 = 5.0;

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

/// Search centre: an address, a `coordinates` object, or top-level
/// `latitude`/`longitude`. Coordinates win when both are given.
#[derive(Debug, Deserialize)]
pub(super) struct OriginRequest {
    #[serde(default, alias = "adress")]
    address: Option<String>,
    #[serde(default)]
    coordinates: Option<Coordinates>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default = "default_radius_km")]
    max_distance_km: f64,
}

impl OriginRequest {
    fn origin(&self, request_id: &str) -> Result<GeoOrigin, ApiError> {
        if let Some(coordinates) = self.coordinates {
            return Ok(GeoOrigin::Coordinates(coordinates));
        }
        match (self.latitude, self.longitude, self.address.as_deref()) {
            (Some(latitude), Some(longitude), _) => Ok(GeoOrigin::Coordinates(Coordinates {
                latitude,
                longitude,
            })),
            (None, None, Some(address)) if !address.trim().is_empty() => {
                Ok(GeoOrigin::Address(address.trim().to_owned()))
            }
            (Some(_), None, _) | (None, Some(_), _) => Err(ApiError::new(
                request_id,
                "validation_error",
                "latitude and longitude must be given together",
            )),
            _ => Err(ApiError::new(
                request_id,
                "validation_error",
                "an address or coordinates are required",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GroceriesRequest {
    #[serde(flatten)]
    origin: OriginRequest,
    items: Vec<ItemQuery>,
}

#[derive(Debug, Serialize)]
pub(super) struct NearbyStore {
    #[serde(flatten)]
    location: StoreLocation,
    /// Retailer handled by an adapter, if any.
    store: Option<StoreId>,
    supported: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct StoreGroceries {
    location: StoreLocation,
    store: StoreId,
    summary: BatchSummary,
    results: Vec<ItemResult>,
}

#[derive(Debug, Serialize)]
pub(super) struct GroceriesData {
    stores_found: usize,
    stores_searched: usize,
    stores: Vec<StoreGroceries>,
}

impl From<StoreBatch> for StoreGroceries {
    fn from(batch: StoreBatch) -> Self {
        Self {
            summary: batch.summary(),
            location: batch.location,
            store: batch.store,
            results: batch.results,
        }
    }
}

async fn find_stores(
    state: &AppState,
    request_id: &str,
    request: &OriginRequest,
) -> Result<Vec<StoreLocation>, ApiError> {
    let origin = request.origin(request_id)?;
    state
        .geo
        .find_supermarkets(&origin, request.max_distance_km)
        .await
        .map_err(|e| map_geo_error(request_id.to_owned(), &e))
}

pub(super) async fn closest_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<OriginRequest>,
) -> Result<Json<ApiResponse<Vec<NearbyStore>>>, ApiError> {
    let stores = find_stores(&state, &req_id.0, &body).await?;

    let data = stores
        .into_iter()
        .map(|location| {
            let store = StoreId::recognize(&location.name, &location.brand);
            NearbyStore {
                location,
                store,
                supported: store.is_some(),
            }
        })
        .collect();

    Ok(ApiResponse::new(req_id.0, data))
}

pub(super) async fn closest_store_groceries(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GroceriesRequest>,
) -> Result<Json<ApiResponse<GroceriesData>>, ApiError> {
    validate_items(&req_id.0, &body.items)?;
    let locations = find_stores(&state, &req_id.0, &body.origin).await?;

    let mut batches = state
        .estimator
        .estimate_nearby(&locations, &body.items, state.store_concurrency)
        .await;
    batches.sort_by(|a, b| {
        a.location
            .distance_km
            .unwrap_or(f64::MAX)
            .total_cmp(&b.location.distance_km.unwrap_or(f64::MAX))
    });

    Ok(ApiResponse::new(
        req_id.0,
        GroceriesData {
            stores_found: locations.len(),
            stores_searched: batches.len(),
            stores: batches.into_iter().map(StoreGroceries::from).collect(),
        },
    ))
}

use axum::{extract::State, Extension, Json};
use panier_core::{ItemQuery, ItemResult, NOT_FOUND_MESSAGE};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_scraper_error, parse_store, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PriceEstimationRequest {
    item: ItemQuery,
    store: String,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListEstimationRequest {
    items: Vec<ItemQuery>,
    store: String,
    #[serde(default)]
    city: Option<String>,
    /// Lowers the store's worker cap for this request; larger values are
    /// clamped to the cap.
    #[serde(default)]
    max_workers: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct ListEstimationData {
    total_items: usize,
    successful_searches: usize,
    failed_searches: usize,
    results: Vec<ItemResult>,
}

pub(super) fn locality<'a>(state: &'a AppState, city: Option<&'a str>) -> &'a str {
    city.map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&*state.default_city)
}

pub(super) fn validate_items(request_id: &str, items: &[ItemQuery]) -> Result<(), ApiError> {
    match items.iter().position(|item| item.name.trim().is_empty()) {
        Some(index) => Err(ApiError::new(
            request_id,
            "validation_error",
            format!("item {index} has an empty name"),
        )),
        None => Ok(()),
    }
}

pub(super) async fn price_estimation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<PriceEstimationRequest>,
) -> Result<Json<ApiResponse<ItemResult>>, ApiError> {
    let store = parse_store(&req_id.0, &body.store)?;
    validate_items(&req_id.0, std::slice::from_ref(&body.item))?;
    let locality = locality(&state, body.city.as_deref());

    let estimate = state
        .estimator
        .estimate(&body.item, store, locality)
        .await
        .map_err(|e| map_scraper_error(req_id.0.clone(), &e))?;

    if !estimate.success {
        tracing::info!(%store, item = %body.item.name, "item not found");
        return Err(ApiError::new(req_id.0, "not_found", NOT_FOUND_MESSAGE));
    }

    Ok(ApiResponse::new(
        req_id.0,
        ItemResult::from_estimate(body.item, store, estimate),
    ))
}

pub(super) async fn list_price_estimation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ListEstimationRequest>,
) -> Result<Json<ApiResponse<ListEstimationData>>, ApiError> {
    let store = parse_store(&req_id.0, &body.store)?;
    validate_items(&req_id.0, &body.items)?;
    let locality = locality(&state, body.city.as_deref());
    let cap = state.estimator.worker_limits().for_store(store);
    let workers = body
        .max_workers
        .map_or(cap, |requested| requested.clamp(1, cap));

    let results = state
        .estimator
        .estimate_batch(&body.items, store, locality, workers)
        .await;
    let successful_searches = results.iter().filter(|r| r.success).count();

    tracing::info!(
        %store,
        total = results.len(),
        successful = successful_searches,
        "list estimation finished"
    );

    Ok(ApiResponse::new(
        req_id.0,
        ListEstimationData {
            total_items: body.items.len(),
            successful_searches,
            failed_searches: results.len() - successful_searches,
            results,
        },
    ))
}

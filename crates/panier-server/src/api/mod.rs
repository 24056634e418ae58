mod estimation;
mod nearby;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use panier_core::{StoreId, WorkerLimits};
use panier_geo::{GeoClient, GeoError};
use panier_scraper::{Estimator, ScraperError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub estimator: Estimator,
    pub geo: Arc<GeoClient>,
    /// Locality hint used when a request names no city.
    pub default_city: Arc<str>,
    /// Nearby stores estimated at the same time.
    pub store_concurrency: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ServiceDescription {
    message: &'static str,
    endpoints: Vec<EndpointDescription>,
    supported_stores: [StoreId; 4],
    workers_configuration: WorkerLimits,
}

#[derive(Debug, Serialize)]
struct EndpointDescription {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            "upstream_timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_scraper_error(request_id: String, error: &ScraperError) -> ApiError {
    tracing::error!(error = %error, "price estimation failed");
    ApiError::new(request_id, "upstream_unavailable", error.to_string())
}

pub(super) fn map_geo_error(request_id: String, error: &GeoError) -> ApiError {
    let code = match error {
        GeoError::InvalidRequest(_) => "validation_error",
        GeoError::AddressNotFound(_) => "not_found",
        GeoError::Timeout { .. } => "upstream_timeout",
        GeoError::EmptyResponse { .. }
        | GeoError::MalformedResponse { .. }
        | GeoError::UnexpectedStatus { .. }
        | GeoError::Http(_) => "upstream_unavailable",
    };
    if code.starts_with("upstream") {
        tracing::error!(error = %error, "store lookup failed");
    } else {
        tracing::info!(error = %error, "store lookup rejected");
    }
    ApiError::new(request_id, code, error.to_string())
}

pub(super) fn parse_store(request_id: &str, raw: &str) -> Result<StoreId, ApiError> {
    raw.parse::<StoreId>()
        .map_err(|e| ApiError::new(request_id, "bad_request", e.to_string()))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/price_estimation", post(estimation::price_estimation))
        .route(
            "/list_price_estimation",
            post(estimation::list_price_estimation),
        )
        .route("/closest_stores", post(nearby::closest_stores))
        .route(
            "/closest_store_groceries",
            post(nearby::closest_store_groceries),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn root(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ServiceDescription>> {
    let endpoint = |method, path, description| EndpointDescription {
        method,
        path,
        description,
    };
    ApiResponse::new(
        req_id.0,
        ServiceDescription {
            message: "panier grocery price estimation API",
            endpoints: vec![
                endpoint("GET", "/api/v1/health", "liveness probe"),
                endpoint(
                    "POST",
                    "/price_estimation",
                    "estimate one item at one store",
                ),
                endpoint(
                    "POST",
                    "/list_price_estimation",
                    "estimate a list of items at one store",
                ),
                endpoint(
                    "POST",
                    "/closest_stores",
                    "list supermarkets near an address or point",
                ),
                endpoint(
                    "POST",
                    "/closest_store_groceries",
                    "estimate a list of items at every supported nearby store",
                ),
            ],
            supported_stores: StoreId::ALL,
            workers_configuration: state.estimator.worker_limits(),
        },
    )
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    (
        StatusCode::OK,
        ApiResponse::new(req_id.0, HealthData { status: "ok" }),
    )
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

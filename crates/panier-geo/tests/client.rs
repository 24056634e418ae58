//! Integration tests for `GeoClient` using wiremock HTTP mocks.

use std::time::Duration;

use panier_geo::{Coordinates, GeoClient, GeoEndpoints, GeoError, GeoOrigin};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGIN: Coordinates = Coordinates {
    latitude: 48.8722,
    longitude: 2.0931,
};

fn endpoints(geocoder: &[&MockServer], overpass: &[&MockServer]) -> GeoEndpoints {
    GeoEndpoints {
        geocoder: geocoder.iter().map(|s| s.uri()).collect(),
        overpass: overpass
            .iter()
            .map(|s| format!("{}/api/interpreter", s.uri()))
            .collect(),
    }
}

fn test_client(endpoints: GeoEndpoints, max_retries: u32) -> GeoClient {
    GeoClient::new(endpoints, 2, "panier-tests/0.1", max_retries, 0)
        .expect("client construction should not fail")
}

fn overpass_body() -> serde_json::Value {
    serde_json::json!({
        "version": 0.6,
        "elements": [
            {
                "type": "node",
                "id": 2,
                "lat": 48.8801,
                "lon": 2.1012,
                "tags": {
                    "name": "Super U",
                    "brand": "Super U",
                    "shop": "supermarket",
                    "addr:city": "Marly-le-Roi"
                }
            },
            {
                "type": "node",
                "id": 1,
                "lat": 48.8731,
                "lon": 2.0940,
                "tags": {
                    "name": "Carrefour City",
                    "brand": "Carrefour City",
                    "shop": "convenience",
                    "addr:street": "Rue de Paris",
                    "addr:postcode": "78560",
                    "addr:city": "Le Port-Marly",
                    "opening_hours": "24/7"
                }
            },
            {
                "type": "node",
                "id": 3,
                "lat": 48.8725,
                "lon": 2.0935
            }
        ]
    })
}

// ---------------------------------------------------------------------------
// geocode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn geocode_returns_first_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(query_param("q", "12 rue de Paris, Le Port-Marly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "lat": "48.8722",
                "lon": "2.0931",
                "display_name": "12, Rue de Paris, Le Port-Marly, France"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let coordinates = client
        .geocode("  12 rue de Paris, Le Port-Marly ")
        .await
        .expect("should geocode");

    assert_eq!(coordinates, ORIGIN);
}

#[tokio::test]
async fn geocode_empty_result_is_address_not_found() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&secondary)
        .await;

    let client = test_client(endpoints(&[&primary, &secondary], &[&primary]), 2);
    let err = client.geocode("nulle part").await.unwrap_err();

    assert!(
        matches!(err, GeoError::AddressNotFound(ref a) if a == "nulle part"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn geocode_blank_address_is_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let err = client.geocode("   ").await.unwrap_err();

    assert!(matches!(err, GeoError::InvalidRequest(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// find_supermarkets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn coordinates_search_sorts_by_distance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let stores = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 2.0)
        .await
        .expect("should list stores");

    let names: Vec<_> = stores.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Inconnu", "Carrefour City", "Super U"]);

    let carrefour = &stores[1];
    assert_eq!(carrefour.address, "Rue de Paris, 78560, Le Port-Marly");
    assert_eq!(carrefour.is_opened, Some(true));
    assert_eq!(stores[2].address, "Marly-le-Roi");
    assert_eq!(stores[2].is_opened, None);
    assert_eq!(stores[0].brand, "");

    let distances: Vec<f64> = stores.iter().filter_map(|s| s.distance_km).collect();
    assert_eq!(distances.len(), 3);
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn query_carries_radius_in_metres() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"elements": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let stores = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 1.5)
        .await
        .expect("empty area is not an error");
    assert!(stores.is_empty());

    let requests = server.received_requests().await.expect("recording enabled");
    let data = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "data")
        .map(|(_, v)| v.into_owned())
        .expect("data parameter");
    assert!(data.contains("(around:1500,48.8722,2.0931)"), "got {data}");
    assert!(data.contains(r#"node["shop"="supermarket"]"#));
}

#[tokio::test]
async fn address_origin_is_geocoded_first() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Le Port-Marly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"lat": "48.8722", "lon": "2.0931", "display_name": "Le Port-Marly"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let stores = client
        .find_supermarkets(&GeoOrigin::Address("Le Port-Marly".to_owned()), 3.0)
        .await
        .expect("should list stores");

    assert_eq!(stores.len(), 3);
}

#[tokio::test]
async fn invalid_radius_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    for radius in [0.0, -1.0, 50.5, f64::NAN] {
        let err = client
            .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), radius)
            .await
            .unwrap_err();
        assert!(matches!(err, GeoError::InvalidRequest(_)), "radius {radius}: {err:?}");
    }
}

#[tokio::test]
async fn maximum_radius_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"elements": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    assert!(client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 50.0)
        .await
        .is_ok());
}

// ---------------------------------------------------------------------------
// Retry and fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn falls_back_to_secondary_server() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body()))
        .expect(1)
        .mount(&secondary)
        .await;

    let client = test_client(endpoints(&[&primary], &[&primary, &secondary]), 1);
    let stores = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 2.0)
        .await
        .expect("secondary should answer");

    assert_eq!(stores.len(), 3);
}

#[tokio::test]
async fn retries_transient_errors_on_same_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 3);
    let stores = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 2.0)
        .await
        .expect("third attempt succeeds");

    assert_eq!(stores.len(), 3);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 3);
    let err = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 2.0)
        .await
        .unwrap_err();

    assert!(
        matches!(err, GeoError::UnexpectedStatus { status: 404, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn every_server_failing_returns_last_error() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .expect(1)
        .mount(&secondary)
        .await;

    let client = test_client(endpoints(&[&primary], &[&primary, &secondary]), 0);
    let err = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 2.0)
        .await
        .unwrap_err();

    assert!(matches!(err, GeoError::MalformedResponse { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Payload errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_json_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let err = client
        .find_supermarkets(&GeoOrigin::Coordinates(ORIGIN), 2.0)
        .await
        .unwrap_err();

    assert!(matches!(err, GeoError::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn empty_body_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = test_client(endpoints(&[&server], &[&server]), 0);
    let err = client.geocode("Marly-le-Roi").await.unwrap_err();

    assert!(matches!(err, GeoError::EmptyResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = GeoClient::new(endpoints(&[&server], &[&server]), 1, "panier-tests/0.1", 0, 0)
        .expect("client construction should not fail");
    let err = client.geocode("Marly-le-Roi").await.unwrap_err();

    assert!(matches!(err, GeoError::Timeout { .. }), "got {err:?}");
}

#[test]
fn empty_endpoint_list_is_rejected() {
    let err = GeoClient::new(
        GeoEndpoints {
            geocoder: Vec::new(),
            overpass: vec!["http://localhost/api/interpreter".to_owned()],
        },
        5,
        "panier-tests/0.1",
        0,
        0,
    )
    .unwrap_err();
    assert!(matches!(err, GeoError::InvalidRequest(_)));
}

#[test]
fn default_endpoints_point_at_public_services() {
    let defaults = GeoEndpoints::default();
    assert_eq!(defaults.geocoder, ["https://nominatim.openstreetmap.org"]);
    assert_eq!(defaults.overpass.len(), 2);
}

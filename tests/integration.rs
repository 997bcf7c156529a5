use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use delivery_router::api::rest::router;
use delivery_router::engine::geocoder::{GeocodedAddress, GeocodingProvider, MockGeocoder};
use delivery_router::engine::zones::ZoneCatalog;
use delivery_router::error::AppError;
use delivery_router::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn shared_state() -> Arc<AppState> {
    let catalog = ZoneCatalog::default();
    let geocoder = MockGeocoder::new(catalog.reference_center().unwrap(), true);
    Arc::new(AppState::new(catalog, Arc::new(geocoder), 1024))
}

fn setup() -> axum::Router {
    router(shared_state())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_courier(app: &axum::Router, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "name": name,
                "phone": "+7 900 123-45-67",
                "location": { "lat": 55.7601, "lng": 37.6250 },
                "rating": 4.8
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_route(app: &axum::Router, order_id: &str, address: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/routes",
            json!({ "order_id": order_id, "address": address }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["zones"], 4);
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["routes"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_routes"));
    assert!(body.contains("busy_couriers"));
}

#[tokio::test]
async fn zones_listed_by_priority() {
    let app = setup();
    let response = app.oneshot(get_request("/zones")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let radii: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|zone| zone["radius_km"].as_f64().unwrap())
        .collect();
    assert_eq!(radii, vec![5.0, 15.0, 30.0, 50.0]);
}

#[tokio::test]
async fn express_options_for_zone() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(get_request("/zones/outer/express-options"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "express-120");

    let response = app
        .oneshot(get_request("/zones/atlantis/express-options"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quote_for_central_address() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/delivery/quote",
            json!({ "address": "Tverskaya 7", "order_total": 2000.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["zone"]["id"], "center");
    assert_eq!(body["cost"]["base_cost"], 300.0);
    assert_eq!(body["cost"]["is_free"], false);
    assert_eq!(body["formatted_address"], "Tverskaya 7");
    assert!(body["coordinate"]["lat"].is_number());
}

#[tokio::test]
async fn quote_for_unknown_address_is_unsuccessful() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/delivery/quote",
            json!({ "address": "Nowhere street", "order_total": 2000.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("address not found"));
}

#[tokio::test]
async fn quote_with_negative_total_is_unsuccessful() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/delivery/quote",
            json!({ "address": "Arbat", "order_total": -5.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("invalid order total"));
}

struct OfflineGeocoder;

#[async_trait]
impl GeocodingProvider for OfflineGeocoder {
    async fn geocode(&self, _address: &str) -> Result<GeocodedAddress, AppError> {
        Err(AppError::GeocodingUnavailable("upstream timed out".to_string()))
    }
}

#[tokio::test]
async fn quote_with_geocoder_down_is_unsuccessful() {
    let state = AppState::new(ZoneCatalog::default(), Arc::new(OfflineGeocoder), 16);
    let app = router(Arc::new(state));

    let response = app
        .oneshot(json_request(
            "POST",
            "/delivery/quote",
            json!({ "address": "Arbat", "order_total": 1500.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn create_courier_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "  ", "rating": 4.5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_courier_rating_clamped_to_5() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "Max", "rating": 9.9 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rating"], 5.0);
    assert_eq!(body["status"], "Available");
    assert!(body["location"].is_null());
}

#[tokio::test]
async fn create_courier_with_invalid_location_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "Max", "rating": 4.0, "location": { "lat": 123.0, "lng": 0.0 } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_location_update_conflicts() {
    let app = setup();
    let id = create_courier(&app, "Frank").await;
    let reported = Utc::now();

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/location"),
            json!({
                "location": { "lat": 55.77, "lng": 37.63 },
                "recorded_at": reported.to_rfc3339()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["location"]["point"]["lat"], 55.77);

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/location"),
            json!({
                "location": { "lat": 55.70, "lng": 37.60 },
                "recorded_at": (reported - Duration::seconds(60)).to_rfc3339()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn future_dated_location_update_is_bad_request() {
    let app = setup();
    let id = create_courier(&app, "Frank").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/location"),
            json!({
                "location": { "lat": 55.77, "lng": 37.63 },
                "recorded_at": (Utc::now() + Duration::days(365)).to_rfc3339()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/location"),
            json!({
                "location": { "lat": 55.78, "lng": 37.64 },
                "recorded_at": Utc::now().to_rfc3339()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn route_outside_delivery_area_is_unprocessable() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/routes",
            json!({ "order_id": "spb-1", "dropoff": { "lat": 59.9343, "lng": 30.3351 } }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn new_route_reports_pending_delivery() {
    let app = setup();
    create_route(&app, "order-100", "Kremlin").await;

    let res = app
        .oneshot(get_request("/orders/order-100/delivery"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["route"]["status"], "Pending");
    assert!(body["route"]["courier_id"].is_null());
    assert!(body["eta"].is_null());
    assert_eq!(body["timeline"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unknown_order_delivery_is_404() {
    let app = setup();
    let res = app
        .oneshot(get_request("/orders/missing/delivery"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_route_for_order_conflicts() {
    let app = setup();
    create_route(&app, "order-1", "Arbat").await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/routes",
            json!({ "order_id": "order-1", "address": "Arbat" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn busy_courier_assignment_conflicts() {
    let app = setup();
    let courier_id = create_courier(&app, "Dan").await;
    let r1 = create_route(&app, "order-1", "Arbat").await;
    let r2 = create_route(&app, "order-2", "VDNH").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/routes/{r1}/assign"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Assigned");
    assert_eq!(body["courier_id"], courier_id);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/routes/{r2}/assign"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("not available"));

    let res = app.oneshot(get_request("/couriers/available")).await.unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn start_before_assignment_conflicts() {
    let app = setup();
    let route_id = create_route(&app, "order-1", "Arbat").await;

    let res = app
        .oneshot(post_empty(&format!("/routes/{route_id}/start")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn eta_for_unknown_route_is_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let res = app
        .oneshot(get_request(&format!("/routes/{fake_id}/eta")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn optimize_orders_stops_from_depot() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/routes/optimize",
            json!({
                "depot": { "lat": 55.0, "lng": 37.0 },
                "stops": [
                    { "id": "ten", "location": { "lat": 55.0899, "lng": 37.0 } },
                    { "id": "three", "location": { "lat": 55.0270, "lng": 37.0 } },
                    { "id": "seven", "location": { "lat": 55.0630, "lng": 37.0 } }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let order: Vec<&str> = body["stops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stop| stop["id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["three", "seven", "ten"]);
    assert!((body["total_distance_km"].as_f64().unwrap() - 10.0).abs() < 0.1);
}

#[tokio::test]
async fn full_delivery_flow() {
    let state = shared_state();
    let app = router(state.clone());
    let mut events = state.route_events_tx.subscribe();

    let courier_id = create_courier(&app, "Dispatch Dan").await;
    let route_id = create_route(&app, "order-7", "Sokolniki").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/routes/{route_id}/assign"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/routes/{route_id}/eta")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_json(res).await.is_null());

    let res = app
        .clone()
        .oneshot(post_empty(&format!("/routes/{route_id}/start")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/routes/{route_id}/eta")))
        .await
        .unwrap();
    let eta = body_json(res).await;
    assert!(eta["remaining_distance_km"].as_f64().unwrap() > 0.0);
    assert!(eta["estimated_minutes"].as_u64().unwrap() > 0);

    let res = app
        .clone()
        .oneshot(get_request("/orders/order-7/delivery"))
        .await
        .unwrap();
    let status = body_json(res).await;
    assert_eq!(status["status_label"], "On the way");
    assert_eq!(status["courier"]["id"], courier_id);

    let res = app
        .clone()
        .oneshot(post_empty(&format!("/routes/{route_id}/complete")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "Completed");

    let res = app.oneshot(get_request("/couriers/available")).await.unwrap();
    let available = body_json(res).await;
    assert_eq!(available[0]["id"], courier_id);
    assert_eq!(available[0]["completed_deliveries"], 1);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(serde_json::to_value(&event.kind).unwrap());
    }
    assert_eq!(
        kinds,
        vec![json!("Created"), json!("Assigned"), json!("Started"), json!("Completed")]
    );
}

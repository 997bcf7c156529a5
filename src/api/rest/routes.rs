use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::delivery::{create_delivery_route, OrderDelivery};
use crate::engine::optimizer::{optimize_route, tour_length_km};
use crate::engine::routing::{assign_courier, cancel_route, complete_route, get_route, start_route};
use crate::engine::tracking::{estimate_arrival, get_delivery_status, DeliveryStatus, Eta};
use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::route::{Route, Stop};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/routes", post(create_route))
        .route("/routes/optimize", post(optimize))
        .route("/routes/:id", get(fetch_route))
        .route("/routes/:id/assign", post(assign))
        .route("/routes/:id/start", post(start))
        .route("/routes/:id/complete", post(complete))
        .route("/routes/:id/cancel", post(cancel))
        .route("/routes/:id/eta", get(eta))
        .route("/orders/:order_id/delivery", get(delivery_status))
}

#[derive(Deserialize)]
pub struct CreateRouteRequest {
    pub order_id: String,
    #[serde(flatten)]
    pub delivery: OrderDelivery,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub courier_id: Uuid,
}

#[derive(Deserialize)]
pub struct OptimizeRequest {
    pub depot: Option<GeoPoint>,
    pub stops: Vec<Stop>,
}

#[derive(Serialize)]
pub struct OptimizeResponse {
    pub stops: Vec<Stop>,
    pub total_distance_km: f64,
}

async fn create_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<Json<Route>, AppError> {
    let route = create_delivery_route(&state, &payload.order_id, payload.delivery).await?;
    Ok(Json(route))
}

async fn fetch_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    Ok(Json(get_route(&state, id)?))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Route>, AppError> {
    Ok(Json(assign_courier(&state, id, payload.courier_id)?))
}

async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    Ok(Json(start_route(&state, id)?))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    Ok(Json(complete_route(&state, id)?))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    Ok(Json(cancel_route(&state, id)?))
}

/// `null` while the route is not under way.
async fn eta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Eta>>, AppError> {
    if !state.routes.contains_key(&id) {
        return Err(AppError::NotFound(format!("route {id} not found")));
    }
    Ok(Json(estimate_arrival(&state, id)))
}

async fn delivery_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<DeliveryStatus>, AppError> {
    get_delivery_status(&state, &order_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no delivery for order {order_id}")))
}

async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let depot = payload.depot.unwrap_or(state.catalog.depot);
    let stops = optimize_route(&depot, payload.stops)?;
    let total_distance_km = tour_length_km(&depot, &stops);

    Ok(Json(OptimizeResponse {
        stops,
        total_distance_km,
    }))
}

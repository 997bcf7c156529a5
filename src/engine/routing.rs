use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{distance_km, validate};
use crate::models::courier::{Courier, CourierLocation, CourierStatus, GeoPoint};
use crate::models::route::{Route, RouteEvent, RouteEventKind, RouteStatus};
use crate::state::AppState;

/// How far ahead of the server clock a device timestamp may be.
pub const MAX_CLOCK_SKEW_SECS: i64 = 30;

/// Assumed average urban driving speed.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

pub fn travel_minutes(distance_km: f64) -> u32 {
    (distance_km / AVERAGE_SPEED_KMH * 60.0).ceil() as u32
}

pub fn create_route(
    state: &AppState,
    order_id: &str,
    pickup: GeoPoint,
    dropoff: GeoPoint,
    delivery_address: Option<String>,
) -> Result<Route, AppError> {
    let order_id = order_id.trim();
    if order_id.is_empty() {
        return Err(AppError::BadRequest("order_id cannot be empty".to_string()));
    }

    let distance = distance_km(&pickup, &dropoff)?;
    let route = Route {
        id: Uuid::new_v4(),
        order_id: order_id.to_string(),
        courier_id: None,
        status: RouteStatus::Pending,
        pickup_location: pickup,
        delivery_location: dropoff,
        delivery_address,
        distance_km: distance,
        estimated_minutes: travel_minutes(distance),
        created_at: Utc::now(),
        assigned_at: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
    };

    match state.routes_by_order.entry(route.order_id.clone()) {
        Entry::Occupied(existing) => {
            return Err(AppError::Conflict(format!(
                "order {} already has route {}",
                order_id,
                existing.get()
            )));
        }
        Entry::Vacant(slot) => {
            state.routes.insert(route.id, route.clone());
            slot.insert(route.id);
        }
    }

    state.metrics.active_routes.inc();
    state.publish(RouteEvent::from_route(&route, RouteEventKind::Created));

    info!(
        route_id = %route.id,
        order_id = %route.order_id,
        distance_km = route.distance_km,
        estimated_minutes = route.estimated_minutes,
        "route created"
    );

    Ok(route)
}

pub fn get_route(state: &AppState, route_id: Uuid) -> Result<Route, AppError> {
    state
        .routes
        .get(&route_id)
        .map(|route| route.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("route {route_id} not found")))
}

/// Flips the courier from Available to Busy and links it to `route_id`.
/// The caller holds the courier's entry lock, so check and write happen
/// as one step.
fn try_claim(courier: &mut Courier, route_id: Uuid) -> Result<(), AppError> {
    if courier.status != CourierStatus::Available {
        return Err(AppError::CourierUnavailable(courier.id));
    }

    courier.status = CourierStatus::Busy;
    courier.current_route_id = Some(route_id);
    courier.updated_at = Utc::now();
    Ok(())
}

pub fn assign_courier(
    state: &AppState,
    route_id: Uuid,
    courier_id: Uuid,
) -> Result<Route, AppError> {
    let result = claim_for_route(state, route_id, courier_id);

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .courier_assignments_total
        .with_label_values(&[outcome])
        .inc();

    match &result {
        Ok(route) => {
            state.metrics.busy_couriers.inc();
            state.publish(RouteEvent::from_route(route, RouteEventKind::Assigned));
            info!(route_id = %route_id, courier_id = %courier_id, "courier assigned");
        }
        Err(err) => {
            warn!(route_id = %route_id, courier_id = %courier_id, error = %err, "assignment rejected");
        }
    }

    result
}

fn claim_for_route(state: &AppState, route_id: Uuid, courier_id: Uuid) -> Result<Route, AppError> {
    let mut route = state
        .routes
        .get_mut(&route_id)
        .ok_or_else(|| AppError::NotFound(format!("route {route_id} not found")))?;

    if route.status != RouteStatus::Pending {
        return Err(AppError::RouteNotPending(route_id));
    }

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    try_claim(&mut courier, route_id)?;

    route.status = RouteStatus::Assigned;
    route.courier_id = Some(courier_id);
    route.assigned_at = Some(Utc::now());

    Ok(route.clone())
}

pub fn start_route(state: &AppState, route_id: Uuid) -> Result<Route, AppError> {
    advance(state, route_id, RouteStatus::InProgress)
}

pub fn complete_route(state: &AppState, route_id: Uuid) -> Result<Route, AppError> {
    advance(state, route_id, RouteStatus::Completed)
}

pub fn cancel_route(state: &AppState, route_id: Uuid) -> Result<Route, AppError> {
    advance(state, route_id, RouteStatus::Cancelled)
}

fn advance(state: &AppState, route_id: Uuid, next: RouteStatus) -> Result<Route, AppError> {
    let (route, released) = {
        let mut route = state
            .routes
            .get_mut(&route_id)
            .ok_or_else(|| AppError::NotFound(format!("route {route_id} not found")))?;

        if !route.status.can_transition_to(next) {
            warn!(
                route_id = %route_id,
                from = ?route.status,
                to = ?next,
                "rejected out-of-order route transition"
            );
            return Err(AppError::InvalidTransition {
                route_id,
                from: route.status,
                to: next,
            });
        }

        let now = Utc::now();
        route.status = next;
        match next {
            RouteStatus::InProgress => route.started_at = Some(now),
            RouteStatus::Completed => route.completed_at = Some(now),
            RouteStatus::Cancelled => route.cancelled_at = Some(now),
            RouteStatus::Pending | RouteStatus::Assigned => {}
        }

        let released = match (next, route.courier_id) {
            (RouteStatus::Completed | RouteStatus::Cancelled, Some(courier_id)) => {
                release_courier(state, courier_id, route_id, next == RouteStatus::Completed)
            }
            _ => false,
        };

        (route.clone(), released)
    };

    if !route.status.is_active() {
        state.metrics.active_routes.dec();
    }
    if released {
        state.metrics.busy_couriers.dec();
    }

    let kind = match next {
        RouteStatus::InProgress => RouteEventKind::Started,
        RouteStatus::Completed => RouteEventKind::Completed,
        _ => RouteEventKind::Cancelled,
    };
    state.publish(RouteEvent::from_route(&route, kind));

    info!(route_id = %route_id, status = ?route.status, "route advanced");
    Ok(route)
}

/// Returns true if the courier was still bound to `route_id` and got freed.
fn release_courier(state: &AppState, courier_id: Uuid, route_id: Uuid, delivered: bool) -> bool {
    let Some(mut courier) = state.couriers.get_mut(&courier_id) else {
        warn!(courier_id = %courier_id, route_id = %route_id, "assigned courier vanished");
        return false;
    };

    if courier.current_route_id != Some(route_id) {
        return false;
    }

    courier.status = CourierStatus::Available;
    courier.current_route_id = None;
    if delivered {
        courier.completed_deliveries = courier.completed_deliveries.saturating_add(1);
    }
    courier.updated_at = Utc::now();
    true
}

pub fn register_courier(
    state: &AppState,
    name: &str,
    phone: &str,
    rating: f64,
    location: Option<GeoPoint>,
) -> Result<Courier, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if let Some(point) = &location {
        validate(point)?;
    }

    let courier = Courier::new(
        name.trim().to_string(),
        phone.trim().to_string(),
        rating,
        location,
    );
    state.couriers.insert(courier.id, courier.clone());

    info!(courier_id = %courier.id, name = %courier.name, "courier registered");
    Ok(courier)
}

/// Available couriers, best rated first.
pub fn available_couriers(state: &AppState) -> Vec<Courier> {
    let mut couriers: Vec<Courier> = state
        .couriers
        .iter()
        .filter(|entry| entry.value().status == CourierStatus::Available)
        .map(|entry| entry.value().clone())
        .collect();

    couriers.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
    couriers
}

/// Manual shift changes. Busy is owned by assignment, and a courier in the
/// middle of a route cannot go off shift until it is completed or cancelled.
pub fn set_courier_status(
    state: &AppState,
    courier_id: Uuid,
    status: CourierStatus,
) -> Result<Courier, AppError> {
    if status == CourierStatus::Busy {
        return Err(AppError::BadRequest(
            "couriers become busy through assignment".to_string(),
        ));
    }

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if let Some(route_id) = courier.current_route_id {
        return Err(AppError::Conflict(format!(
            "courier {courier_id} is on route {route_id}"
        )));
    }

    courier.status = status;
    courier.updated_at = Utc::now();
    Ok(courier.clone())
}

/// Overwrites the courier's position and stamps it with the server clock.
/// Without `recorded_at` the last write wins; with it, reports older than
/// the stored one are rejected, and reports from the future are refused.
pub fn update_courier_location(
    state: &AppState,
    courier_id: Uuid,
    point: GeoPoint,
    recorded_at: Option<DateTime<Utc>>,
) -> Result<Courier, AppError> {
    validate(&point)?;

    let now = Utc::now();
    if let Some(incoming) = recorded_at {
        if incoming > now + Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(AppError::BadRequest(format!(
                "recorded_at {incoming} is ahead of server time"
            )));
        }
    }

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if let (Some(incoming), Some(stored)) = (recorded_at, courier.location) {
        if incoming < stored.reported_at {
            return Err(AppError::StaleLocation(courier_id));
        }
    }

    courier.location = Some(CourierLocation {
        point,
        timestamp: now,
        reported_at: recorded_at.unwrap_or(now),
    });
    courier.updated_at = now;

    Ok(courier.clone())
}

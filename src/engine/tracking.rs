use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::geo::haversine_km;
use crate::engine::routing::travel_minutes;
use crate::models::courier::Courier;
use crate::models::route::{Route, RouteStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Eta {
    pub route_id: Uuid,
    pub remaining_distance_km: f64,
    pub estimated_minutes: u32,
    pub estimated_arrival: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineStep {
    pub label: &'static str,
    pub reached: bool,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStatus {
    pub route: Route,
    pub status_label: &'static str,
    pub courier: Option<Courier>,
    pub timeline: Vec<TimelineStep>,
    pub eta: Option<Eta>,
}

pub fn status_label(status: RouteStatus) -> &'static str {
    match status {
        RouteStatus::Pending => "Waiting for a courier",
        RouteStatus::Assigned => "Courier assigned",
        RouteStatus::InProgress => "On the way",
        RouteStatus::Completed => "Delivered",
        RouteStatus::Cancelled => "Cancelled",
    }
}

pub fn build_timeline(route: &Route) -> Vec<TimelineStep> {
    let step = |label, at: Option<DateTime<Utc>>| TimelineStep {
        label,
        reached: at.is_some(),
        at,
    };

    let mut timeline = vec![
        step("Order confirmed", Some(route.created_at)),
        step("Courier assigned", route.assigned_at),
        step("On the way", route.started_at),
        step("Delivered", route.completed_at),
    ];
    if route.cancelled_at.is_some() {
        timeline.push(step("Cancelled", route.cancelled_at));
    }
    timeline
}

/// Remaining time for a route that is under way. Anything else (unknown
/// route, not started yet, courier without a position) yields `None`.
pub fn estimate_arrival(state: &AppState, route_id: Uuid) -> Option<Eta> {
    let route = state.routes.get(&route_id)?.value().clone();
    eta_for(state, &route)
}

fn eta_for(state: &AppState, route: &Route) -> Option<Eta> {
    if route.status != RouteStatus::InProgress {
        return None;
    }
    let courier_id = route.courier_id?;
    let location = state.couriers.get(&courier_id)?.location?;

    let remaining = haversine_km(&location.point, &route.delivery_location);
    let minutes = travel_minutes(remaining);

    Some(Eta {
        route_id: route.id,
        remaining_distance_km: remaining,
        estimated_minutes: minutes,
        estimated_arrival: Utc::now() + Duration::minutes(i64::from(minutes)),
    })
}

pub fn get_delivery_status(state: &AppState, order_id: &str) -> Option<DeliveryStatus> {
    let route = state.route_for_order(order_id)?;
    let courier = route
        .courier_id
        .and_then(|id| state.couriers.get(&id).map(|entry| entry.value().clone()));

    Some(DeliveryStatus {
        status_label: status_label(route.status),
        courier,
        timeline: build_timeline(&route),
        eta: eta_for(state, &route),
        route,
    })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RouteStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl RouteStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Pending, RouteStatus::Assigned)
                | (RouteStatus::Assigned, RouteStatus::InProgress)
                | (RouteStatus::InProgress, RouteStatus::Completed)
                | (RouteStatus::Pending, RouteStatus::Cancelled)
                | (RouteStatus::Assigned, RouteStatus::Cancelled)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            RouteStatus::Pending | RouteStatus::Assigned | RouteStatus::InProgress
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub order_id: String,
    pub courier_id: Option<Uuid>,
    pub status: RouteStatus,
    pub pickup_location: GeoPoint,
    pub delivery_location: GeoPoint,
    pub delivery_address: Option<String>,
    pub distance_km: f64,
    pub estimated_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// One stop of a multi-drop run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub id: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RouteEventKind {
    Created,
    Assigned,
    Started,
    Completed,
    Cancelled,
}

/// Broadcast to tracking subscribers on every route transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEvent {
    pub route_id: Uuid,
    pub order_id: String,
    pub kind: RouteEventKind,
    pub status: RouteStatus,
    pub courier_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

impl RouteEvent {
    pub fn from_route(route: &Route, kind: RouteEventKind) -> Self {
        Self {
            route_id: route.id,
            order_id: route.order_id.clone(),
            kind,
            status: route.status,
            courier_id: route.courier_id,
            at: Utc::now(),
        }
    }
}

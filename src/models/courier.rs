use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CourierStatus {
    Available,
    Busy,
    Offline,
}

/// Last reported position of a courier. `timestamp` is when the server
/// stored it, `reported_at` is the device's own clock (or `timestamp` when
/// the device sent none) and only orders reports against each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CourierLocation {
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub location: Option<CourierLocation>,
    pub current_route_id: Option<Uuid>,
    pub rating: f64,
    pub completed_deliveries: u32,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn new(name: String, phone: String, rating: f64, location: Option<GeoPoint>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            phone,
            status: CourierStatus::Available,
            location: location.map(|point| CourierLocation {
                point,
                timestamp: now,
                reported_at: now,
            }),
            current_route_id: None,
            rating: rating.clamp(0.0, 5.0),
            completed_deliveries: 0,
            updated_at: now,
        }
    }
}

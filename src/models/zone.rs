use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::courier::GeoPoint;

/// A concentric pricing band around the reference center.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub price_base: f64,
    pub min_order_for_free: f64,
    pub radius_km: f64,
    pub center: GeoPoint,
    pub delivery_time_label: String,
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpressOption {
    pub id: String,
    pub name: String,
    pub additional_price: f64,
    pub delivery_time_label: String,
    pub applicable_zone_ids: BTreeSet<String>,
}

impl ExpressOption {
    pub fn applies_to(&self, zone_id: &str) -> bool {
        self.applicable_zone_ids.contains(zone_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryCost {
    pub base_cost: f64,
    pub express_cost: f64,
    pub total: f64,
    pub is_free: bool,
    pub delivery_time_label: String,
}

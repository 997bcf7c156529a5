use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo::{distance_km, validate};
use crate::models::courier::GeoPoint;
use crate::models::zone::{ExpressOption, Zone};

/// Static delivery reference data, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneCatalog {
    pub zones: Vec<Zone>,
    pub express_options: Vec<ExpressOption>,
    /// Shop the bouquets are picked up from; also the optimizer's start point.
    pub depot: GeoPoint,
}

impl ZoneCatalog {
    pub fn new(
        zones: Vec<Zone>,
        express_options: Vec<ExpressOption>,
        depot: GeoPoint,
    ) -> Result<Self, AppError> {
        let catalog = Self {
            zones,
            express_options,
            depot,
        };
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::Internal(format!("failed to read {}: {err}", path.display()))
        })?;
        let catalog: ZoneCatalog = serde_json::from_str(&raw).map_err(|err| {
            AppError::Internal(format!("invalid zone catalog {}: {err}", path.display()))
        })?;
        catalog.check()?;
        Ok(catalog)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.zones.is_empty() {
            return Err(AppError::Internal(
                "zone catalog must define at least one zone".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            if !seen.insert(zone.id.as_str()) {
                return Err(AppError::Internal(format!("duplicate zone id {}", zone.id)));
            }
            if zone.radius_km <= 0.0 || !zone.radius_km.is_finite() {
                return Err(AppError::Internal(format!(
                    "zone {} has invalid radius {}",
                    zone.id, zone.radius_km
                )));
            }
            if !(zone.price_base >= 0.0 && zone.min_order_for_free >= 0.0) {
                return Err(AppError::Internal(format!(
                    "zone {} has a negative price or free-delivery threshold",
                    zone.id
                )));
            }
            validate(&zone.center)?;
        }

        for option in &self.express_options {
            if !(option.additional_price >= 0.0) {
                return Err(AppError::Internal(format!(
                    "express option {} has a negative price",
                    option.id
                )));
            }
            if let Some(unknown) = option
                .applicable_zone_ids
                .iter()
                .find(|zone_id| !seen.contains(zone_id.as_str()))
            {
                return Err(AppError::Internal(format!(
                    "express option {} names unknown zone {unknown}",
                    option.id
                )));
            }
        }
        validate(&self.depot)?;

        Ok(())
    }

    /// Every zone is measured from this point. Only the first configured
    /// zone's center is consulted; the per-zone centers are informational.
    pub fn reference_center(&self) -> Option<GeoPoint> {
        self.zones.first().map(|zone| zone.center)
    }

    /// Zones ordered by ascending priority.
    pub fn all_zones(&self) -> Vec<Zone> {
        let mut zones = self.zones.clone();
        zones.sort_by_key(|zone| zone.priority);
        zones
    }

    pub fn zone(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == zone_id)
    }

    pub fn express_option(&self, option_id: &str) -> Option<&ExpressOption> {
        self.express_options
            .iter()
            .find(|option| option.id == option_id)
    }

    pub fn express_options_for_zone(&self, zone_id: &str) -> Result<Vec<ExpressOption>, AppError> {
        if self.zone(zone_id).is_none() {
            return Err(AppError::NotFound(format!("zone {zone_id} not found")));
        }

        Ok(self
            .express_options
            .iter()
            .filter(|option| option.applies_to(zone_id))
            .cloned()
            .collect())
    }

    /// Nearest enclosing ring: the first zone by priority whose radius
    /// covers the distance from the reference center. `None` means the
    /// point is outside the delivery area.
    pub fn resolve_zone(&self, point: &GeoPoint) -> Result<Option<&Zone>, AppError> {
        validate(point)?;
        let Some(center) = self.reference_center() else {
            return Ok(None);
        };
        let distance = distance_km(&center, point)?;

        let mut ordered: Vec<&Zone> = self.zones.iter().collect();
        ordered.sort_by_key(|zone| zone.priority);

        Ok(ordered.into_iter().find(|zone| zone.radius_km >= distance))
    }
}

impl Default for ZoneCatalog {
    fn default() -> Self {
        let center = GeoPoint::new(55.7558, 37.6173);
        let zone = |id: &str, name: &str, radius_km, price_base, min_free, label: &str, priority| {
            Zone {
                id: id.to_string(),
                name: name.to_string(),
                price_base,
                min_order_for_free: min_free,
                radius_km,
                center,
                delivery_time_label: label.to_string(),
                priority,
            }
        };
        let zone_ids = |ids: &[&str]| -> BTreeSet<String> {
            ids.iter().map(|id| id.to_string()).collect()
        };

        Self {
            zones: vec![
                zone("center", "City center", 5.0, 300.0, 3000.0, "1-2 hours", 1),
                zone("inner", "Inner districts", 15.0, 500.0, 5000.0, "2-3 hours", 2),
                zone("outer", "Outer districts", 30.0, 800.0, 8000.0, "3-4 hours", 3),
                zone("suburbs", "Suburbs", 50.0, 1200.0, 12000.0, "4-6 hours", 4),
            ],
            express_options: vec![
                ExpressOption {
                    id: "express-60".to_string(),
                    name: "Express in 60 minutes".to_string(),
                    additional_price: 500.0,
                    delivery_time_label: "up to 60 minutes".to_string(),
                    applicable_zone_ids: zone_ids(&["center", "inner"]),
                },
                ExpressOption {
                    id: "express-120".to_string(),
                    name: "Express in 2 hours".to_string(),
                    additional_price: 300.0,
                    delivery_time_label: "up to 2 hours".to_string(),
                    applicable_zone_ids: zone_ids(&["center", "inner", "outer"]),
                },
            ],
            depot: GeoPoint::new(55.7601, 37.6250),
        }
    }
}

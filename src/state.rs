use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::engine::geocoder::GeocodingProvider;
use crate::engine::zones::ZoneCatalog;
use crate::models::courier::Courier;
use crate::models::route::{Route, RouteEvent};
use crate::observability::metrics::Metrics;

/// Courier and route tables plus the reference data every operation reads.
///
/// When more than one table is locked at once the order is
/// `routes_by_order`, then `routes`, then `couriers`.
pub struct AppState {
    pub catalog: ZoneCatalog,
    pub geocoder: Arc<dyn GeocodingProvider>,
    pub couriers: DashMap<Uuid, Courier>,
    pub routes: DashMap<Uuid, Route>,
    pub routes_by_order: DashMap<String, Uuid>,
    pub route_events_tx: broadcast::Sender<RouteEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        catalog: ZoneCatalog,
        geocoder: Arc<dyn GeocodingProvider>,
        event_buffer_size: usize,
    ) -> Self {
        let (route_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            catalog,
            geocoder,
            couriers: DashMap::new(),
            routes: DashMap::new(),
            routes_by_order: DashMap::new(),
            route_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn publish(&self, event: RouteEvent) {
        // no subscribers is fine
        let _ = self.route_events_tx.send(event);
    }

    /// Order ids are indexed trimmed, so lookups trim too.
    pub fn route_for_order(&self, order_id: &str) -> Option<Route> {
        let route_id = *self.routes_by_order.get(order_id.trim())?;
        self.routes.get(&route_id).map(|route| route.value().clone())
    }
}

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::pricing::compute_delivery_cost;
use crate::engine::routing::create_route;
use crate::error::AppError;
use crate::geo::validate;
use crate::models::courier::GeoPoint;
use crate::models::route::Route;
use crate::models::zone::{DeliveryCost, Zone};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub zone: Zone,
    pub cost: DeliveryCost,
    pub coordinate: GeoPoint,
    pub formatted_address: String,
}

/// Delivery details of a confirmed order. Either field locates the
/// recipient; an explicit coordinate skips geocoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderDelivery {
    pub address: Option<String>,
    pub dropoff: Option<GeoPoint>,
}

/// Checkout quote: geocode the address, find its zone and price it.
pub async fn get_delivery_info(
    state: &AppState,
    address: &str,
    order_total: f64,
    express_option_id: Option<&str>,
) -> Result<DeliveryInfo, AppError> {
    let start = Instant::now();
    let result = quote(state, address, order_total, express_option_id).await;

    let outcome = match &result {
        Ok(_) => "quoted",
        Err(AppError::OutOfServiceArea) => "out_of_area",
        Err(AppError::AddressNotFound(_)) => "address_not_found",
        Err(_) => "error",
    };
    state
        .metrics
        .quote_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .delivery_quotes_total
        .with_label_values(&[outcome])
        .inc();

    match &result {
        Ok(info) => info!(zone = %info.zone.id, total = info.cost.total, "delivery quoted"),
        Err(err) => warn!(error = %err, "delivery quote failed"),
    }

    result
}

async fn quote(
    state: &AppState,
    address: &str,
    order_total: f64,
    express_option_id: Option<&str>,
) -> Result<DeliveryInfo, AppError> {
    if !order_total.is_finite() || order_total < 0.0 {
        return Err(AppError::BadRequest(format!(
            "invalid order total {order_total}"
        )));
    }

    let geocoded = state.geocoder.geocode(address).await?;
    let zone = state
        .catalog
        .resolve_zone(&geocoded.coordinate)?
        .ok_or(AppError::OutOfServiceArea)?;
    let cost = compute_delivery_cost(&state.catalog, zone, order_total, express_option_id);

    Ok(DeliveryInfo {
        zone: zone.clone(),
        cost,
        coordinate: geocoded.coordinate,
        formatted_address: geocoded.formatted_address,
    })
}

/// Plans the route for a confirmed order, from the shop to the recipient.
pub async fn create_delivery_route(
    state: &AppState,
    order_id: &str,
    delivery: OrderDelivery,
) -> Result<Route, AppError> {
    let (dropoff, address) = match (delivery.dropoff, delivery.address) {
        (Some(point), address) => {
            validate(&point)?;
            (point, address)
        }
        (None, Some(address)) => {
            let geocoded = state.geocoder.geocode(&address).await?;
            (geocoded.coordinate, Some(geocoded.formatted_address))
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "either address or dropoff is required".to_string(),
            ));
        }
    };

    if state.catalog.resolve_zone(&dropoff)?.is_none() {
        return Err(AppError::OutOfServiceArea);
    }

    create_route(state, order_id, state.catalog.depot, dropoff, address)
}

use tracing::warn;

use crate::engine::zones::ZoneCatalog;
use crate::models::zone::{DeliveryCost, Zone};

/// Quote for delivering an order of `order_total` into `zone`.
///
/// Base delivery is waived once the order reaches the zone's free-delivery
/// threshold. An express option only applies when it lists the zone; in that
/// case its surcharge is added and its time label replaces the zone's.
pub fn compute_delivery_cost(
    catalog: &ZoneCatalog,
    zone: &Zone,
    order_total: f64,
    express_option_id: Option<&str>,
) -> DeliveryCost {
    let is_free = order_total >= zone.min_order_for_free;
    let base_cost = if is_free { 0.0 } else { zone.price_base };

    let express = express_option_id.and_then(|id| {
        let option = catalog.express_option(id);
        if option.is_none() {
            warn!(express_option_id = id, "unknown express option ignored");
        }
        option.filter(|option| option.applies_to(&zone.id))
    });

    let (express_cost, delivery_time_label) = match express {
        Some(option) => (option.additional_price, option.delivery_time_label.clone()),
        None => (0.0, zone.delivery_time_label.clone()),
    };

    DeliveryCost {
        base_cost,
        express_cost,
        total: base_cost + express_cost,
        is_free,
        delivery_time_label,
    }
}

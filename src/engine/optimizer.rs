use crate::error::AppError;
use crate::geo::{haversine_km, validate};
use crate::models::courier::GeoPoint;
use crate::models::route::Stop;

/// Orders stops with the nearest-neighbor heuristic starting at `depot`.
///
/// Each step picks the remaining stop closest to the current position; ties
/// keep the earlier stop. The result is a permutation of the input, not an
/// optimal tour.
pub fn optimize_route(depot: &GeoPoint, stops: Vec<Stop>) -> Result<Vec<Stop>, AppError> {
    validate(depot)?;
    for stop in &stops {
        validate(&stop.location)?;
    }

    let mut remaining = stops;
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = *depot;

    while !remaining.is_empty() {
        let mut best_index = 0;
        let mut best_distance = f64::INFINITY;

        for (index, stop) in remaining.iter().enumerate() {
            let distance = haversine_km(&current, &stop.location);
            if distance < best_distance {
                best_index = index;
                best_distance = distance;
            }
        }

        let next = remaining.remove(best_index);
        current = next.location;
        ordered.push(next);
    }

    Ok(ordered)
}

/// Total length of visiting `stops` in order from `depot`.
pub fn tour_length_km(depot: &GeoPoint, stops: &[Stop]) -> f64 {
    let mut current = *depot;
    let mut total = 0.0;
    for stop in stops {
        total += haversine_km(&current, &stop.location);
        current = stop.location;
    }
    total
}

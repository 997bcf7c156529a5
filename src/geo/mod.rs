use crate::error::AppError;
use crate::models::courier::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn validate(point: &GeoPoint) -> Result<(), AppError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(AppError::InvalidCoordinate {
            lat: point.lat,
            lng: point.lng,
        })
    }
}

/// Great-circle distance that rejects out-of-range coordinates instead of
/// returning NaN.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> Result<f64, AppError> {
    validate(a)?;
    validate(b)?;
    Ok(haversine_km(a, b))
}

/// Moves `from` toward `to` by at most `step_km`, stopping at `to`.
pub fn step_toward(from: &GeoPoint, to: &GeoPoint, step_km: f64) -> GeoPoint {
    let remaining = haversine_km(from, to);
    if remaining <= step_km {
        return *to;
    }

    let fraction = step_km / remaining;
    GeoPoint {
        lat: from.lat + (to.lat - from.lat) * fraction,
        lng: from.lng + (to.lng - from.lng) * fraction,
    }
}

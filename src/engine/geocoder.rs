use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodedAddress {
    pub coordinate: GeoPoint,
    pub formatted_address: String,
}

/// Turns free-text addresses into coordinates.
///
/// Implementations backed by a real service report misses with
/// `AddressNotFound` and transport problems with `GeocodingUnavailable`.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, AppError>;
}

const JITTER_DEGREES: f64 = 0.25;

/// Offline geocoder backed by a small table of known places.
///
/// Unknown addresses get a random point within `±0.25°` of the city center
/// unless the geocoder is strict, in which case they are reported as not found.
pub struct MockGeocoder {
    known: Vec<(String, GeoPoint)>,
    city_center: GeoPoint,
    strict: bool,
}

impl MockGeocoder {
    pub fn new(city_center: GeoPoint, strict: bool) -> Self {
        let known = [
            ("red square", GeoPoint::new(55.7539, 37.6208)),
            ("tverskaya", GeoPoint::new(55.7652, 37.6050)),
            ("arbat", GeoPoint::new(55.7494, 37.5912)),
            ("kremlin", GeoPoint::new(55.7520, 37.6175)),
            ("sokolniki", GeoPoint::new(55.7920, 37.6770)),
            ("vdnh", GeoPoint::new(55.8263, 37.6377)),
            ("khimki", GeoPoint::new(55.8970, 37.4297)),
            ("zelenograd", GeoPoint::new(55.9825, 37.1814)),
        ]
        .into_iter()
        .map(|(name, point)| (name.to_string(), point))
        .collect();

        Self {
            known,
            city_center,
            strict,
        }
    }

    pub fn with_known(mut self, name: &str, point: GeoPoint) -> Self {
        self.known.push((name.trim().to_lowercase(), point));
        self
    }

    fn lookup(&self, normalized: &str) -> Option<GeoPoint> {
        self.known
            .iter()
            .find(|(name, _)| normalized.contains(name.as_str()) || name.contains(normalized))
            .map(|(_, point)| *point)
    }

    fn jittered_center(&self) -> GeoPoint {
        let mut rng = rand::thread_rng();
        GeoPoint {
            lat: self.city_center.lat + rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES),
            lng: self.city_center.lng + rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES),
        }
    }
}

#[async_trait]
impl GeocodingProvider for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, AppError> {
        let normalized = address.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::AddressNotFound("address is empty".to_string()));
        }

        let coordinate = match self.lookup(&normalized) {
            Some(point) => point,
            None if self.strict => return Err(AppError::AddressNotFound(address.trim().to_string())),
            None => self.jittered_center(),
        };

        Ok(GeocodedAddress {
            coordinate,
            formatted_address: address.trim().to_string(),
        })
    }
}

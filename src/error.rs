use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::route::RouteStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("address outside delivery zone")]
    OutOfServiceArea,

    #[error("address not found: {0}")]
    AddressNotFound(String),

    #[error("geocoding service unavailable: {0}")]
    GeocodingUnavailable(String),

    #[error("courier {0} is not available")]
    CourierUnavailable(Uuid),

    #[error("route {0} is not pending")]
    RouteNotPending(Uuid),

    #[error("route {route_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        route_id: Uuid,
        from: RouteStatus,
        to: RouteStatus,
    },

    #[error("stale location update for courier {0}")]
    StaleLocation(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidCoordinate { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_)
            | AppError::CourierUnavailable(_)
            | AppError::RouteNotPending(_)
            | AppError::InvalidTransition { .. }
            | AppError::StaleLocation(_) => StatusCode::CONFLICT,
            AppError::OutOfServiceArea | AppError::AddressNotFound(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::GeocodingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

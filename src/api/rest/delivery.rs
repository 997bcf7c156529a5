use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::engine::delivery::{get_delivery_info, DeliveryInfo};
use crate::error::AppError;
use crate::models::zone::{ExpressOption, Zone};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/zones", get(list_zones))
        .route("/zones/:id/express-options", get(list_express_options))
        .route("/delivery/quote", post(quote_delivery))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub address: String,
    pub order_total: f64,
    pub express_option_id: Option<String>,
}

/// Checkout widget contract: anything the customer can act on comes back as
/// `success: false`; only internal failures are HTTP errors.
#[derive(Serialize)]
#[serde(untagged)]
pub enum QuoteResponse {
    Quoted {
        success: bool,
        #[serde(flatten)]
        info: DeliveryInfo,
    },
    Rejected {
        success: bool,
        error: String,
    },
}

async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<Zone>> {
    Json(state.catalog.all_zones())
}

async fn list_express_options(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<Json<Vec<ExpressOption>>, AppError> {
    Ok(Json(state.catalog.express_options_for_zone(&zone_id)?))
}

async fn quote_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let result = get_delivery_info(
        &state,
        &payload.address,
        payload.order_total,
        payload.express_option_id.as_deref(),
    )
    .await;

    match result {
        Ok(info) => Ok(Json(QuoteResponse::Quoted {
            success: true,
            info,
        })),
        Err(err @ AppError::Internal(_)) => Err(err),
        Err(err) => Ok(Json(QuoteResponse::Rejected {
            success: false,
            error: err.to_string(),
        })),
    }
}

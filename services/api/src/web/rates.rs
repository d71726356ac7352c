//! services/api/src/web/rates.rs
//!
//! Inspect and refresh the exchange-rate table.

use crate::error::{error_response, ErrorResponse, HandlerError};
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use subtrack_core::currency::RateTable;

/// The rate table currently used for conversions.
#[utoipa::path(
    get,
    path = "/api/rates",
    responses((status = 200, description = "Current rates", body = RateTable))
)]
pub async fn get_rates_handler(State(app_state): State<Arc<AppState>>) -> Json<RateTable> {
    Json(app_state.rates_snapshot().await)
}

/// Fetch live rates now. On failure the current table is kept.
#[utoipa::path(
    post,
    path = "/api/rates/refresh",
    responses(
        (status = 200, description = "Updated rates", body = RateTable),
        (status = 502, description = "Rate provider failed; rates unchanged", body = ErrorResponse)
    )
)]
pub async fn refresh_rates_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<RateTable>, HandlerError> {
    app_state
        .refresh_rates()
        .await
        .map(Json)
        .map_err(|e| error_response(StatusCode::BAD_GATEWAY, e.to_string()))
}

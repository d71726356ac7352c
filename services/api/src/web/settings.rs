//! services/api/src/web/settings.rs
//!
//! Settings endpoints. The settings document is replaced wholesale on save.

use crate::error::{port_error, ApiJson, ErrorResponse, HandlerError};
use crate::web::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use subtrack_core::domain::Settings;
use tracing::{error, info};

/// Read the stored settings. An empty object when nothing was saved yet.
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current settings", body = Settings),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
pub async fn get_settings_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Settings>, HandlerError> {
    let settings = app_state.settings.load_settings().await.map_err(|e| {
        error!("Failed to load settings: {:?}", e);
        port_error(e)
    })?;
    Ok(Json(settings))
}

/// Replace the stored settings with the request body.
#[utoipa::path(
    post,
    path = "/api/settings",
    request_body = Settings,
    responses(
        (status = 200, description = "The saved settings", body = Settings),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
pub async fn save_settings_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(settings): ApiJson<Settings>,
) -> Result<Json<Settings>, HandlerError> {
    app_state.settings.save_settings(&settings).await.map_err(|e| {
        error!("Failed to save settings: {:?}", e);
        port_error(e)
    })?;
    info!("Settings saved");
    Ok(Json(settings))
}

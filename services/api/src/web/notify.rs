//! services/api/src/web/notify.rs
//!
//! Endpoints that send a test message through a notification channel using the
//! settings in the request body, so credentials can be checked before saving.

use crate::error::{error_response, port_error, ApiJson, ErrorResponse, HandlerError};
use crate::web::{rest::SuccessResponse, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use subtrack_core::{
    domain::{Notice, Settings, Subscription},
    ports::{NotificationChannel, PortError},
    reminders, stats,
};
use tracing::error;

/// Missing credentials surface from the channel as `InvalidInput` and become a 400.
async fn send_test(
    channel: &dyn NotificationChannel,
    settings: &Settings,
    notice: &Notice,
) -> Result<Json<SuccessResponse>, HandlerError> {
    channel.send(settings, notice).await.map_err(|e| {
        error!("Test {} notification failed: {:?}", channel.name(), e);
        match e {
            PortError::InvalidInput(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    })?;
    Ok(SuccessResponse::ok())
}

/// Send a test push notification with a summary of the active subscriptions.
#[utoipa::path(
    post,
    path = "/api/test/gotify",
    request_body = Settings,
    responses(
        (status = 200, description = "Sent", body = SuccessResponse),
        (status = 400, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Delivery failed", body = ErrorResponse)
    )
)]
pub async fn test_gotify_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(settings): ApiJson<Settings>,
) -> Result<Json<SuccessResponse>, HandlerError> {
    let active = app_state.active_subscriptions().await.map_err(port_error)?;
    let rates = app_state.rates_snapshot().await;
    let total_monthly: f64 = stats::enrich_all(&active, &rates)
        .iter()
        .map(|e| e.monthly_cost)
        .sum();

    let refs: Vec<&Subscription> = active.iter().collect();
    let notice = reminders::test_push(&refs, total_monthly, &rates);
    send_test(app_state.push_channel.as_ref(), &settings, &notice).await
}

/// Send a test email listing the active subscriptions to `testRecipient`.
#[utoipa::path(
    post,
    path = "/api/test/email",
    request_body = Settings,
    responses(
        (status = 200, description = "Sent", body = SuccessResponse),
        (status = 400, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Delivery failed", body = ErrorResponse)
    )
)]
pub async fn test_email_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(settings): ApiJson<Settings>,
) -> Result<Json<SuccessResponse>, HandlerError> {
    let active = app_state.active_subscriptions().await.map_err(port_error)?;
    let refs: Vec<&Subscription> = active.iter().collect();
    let notice = reminders::test_email(&refs, settings.test_recipient.clone());
    send_test(app_state.email_channel.as_ref(), &settings, &notice).await
}

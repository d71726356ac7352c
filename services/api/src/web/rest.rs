//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the subscription and calendar endpoints and
//! the master definition for the OpenAPI specification.

use crate::error::{error_response, port_error, ApiJson, ErrorResponse, HandlerError};
use crate::web::{insights, notify, rates, settings, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtrack_core::{
    domain::{CalendarDay, EnrichedSubscription, Subscription, SubscriptionStats},
    stats,
};
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_subscriptions_handler,
        save_subscription_handler,
        delete_subscription_handler,
        calendar_handler,
        health_handler,
        settings::get_settings_handler,
        settings::save_settings_handler,
        insights::analyze_handler,
        notify::test_gotify_handler,
        notify::test_email_handler,
        rates::get_rates_handler,
        rates::refresh_rates_handler,
    ),
    components(
        schemas(
            Subscription,
            EnrichedSubscription,
            SubscriptionStats,
            SubscriptionsResponse,
            SuccessResponse,
            CalendarResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "SubTrack API", description = "Subscription tracking, statistics and reminders.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Every subscription with its derived costs, plus the aggregate statistics.
#[derive(Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<EnrichedSubscription>,
    pub stats: SubscriptionStats,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

#[derive(Deserialize, IntoParams)]
pub struct CalendarQuery {
    /// Defaults to the current year.
    pub year: Option<i32>,
    /// 1-12, defaults to the current month.
    pub month: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct CalendarResponse {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every subscription, enriched with home-currency costs, and the statistics.
#[utoipa::path(
    get,
    path = "/api/subscriptions",
    responses(
        (status = 200, description = "Subscriptions and statistics", body = SubscriptionsResponse),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
pub async fn list_subscriptions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SubscriptionsResponse>, HandlerError> {
    let overview = app_state
        .overview(app_state.today())
        .await
        .map_err(|e| {
            error!("Failed to list subscriptions: {:?}", e);
            port_error(e)
        })?;

    Ok(Json(SubscriptionsResponse {
        subscriptions: overview.subscriptions,
        stats: overview.stats,
    }))
}

/// Create a subscription, or update the one with the same `id`.
///
/// Only the fields present in the body replace stored values.
#[utoipa::path(
    post,
    path = "/api/subscriptions",
    request_body = Subscription,
    responses(
        (status = 200, description = "The stored record", body = Subscription),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
pub async fn save_subscription_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(subscription): ApiJson<Subscription>,
) -> Result<Json<Subscription>, HandlerError> {
    let saved = app_state
        .subscriptions
        .save_subscription(subscription)
        .await
        .map_err(|e| {
            error!("Failed to save subscription: {:?}", e);
            port_error(e)
        })?;
    info!("Saved subscription {}", saved.id.as_deref().unwrap_or_default());
    Ok(Json(saved))
}

/// Delete a subscription. Unknown identifiers succeed without changing anything.
#[utoipa::path(
    delete,
    path = "/api/subscriptions/{id}",
    params(("id" = String, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
pub async fn delete_subscription_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, HandlerError> {
    app_state
        .subscriptions
        .delete_subscription(&id)
        .await
        .map_err(|e| {
            error!("Failed to delete subscription {}: {:?}", id, e);
            port_error(e)
        })?;
    Ok(SuccessResponse::ok())
}

/// Active payments of one month, grouped by day.
#[utoipa::path(
    get,
    path = "/api/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Payments by day", body = CalendarResponse),
        (status = 400, description = "Invalid month", body = ErrorResponse),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
pub async fn calendar_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, HandlerError> {
    let today = app_state.today();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());
    if !(1..=12).contains(&month) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid month {}", month),
        ));
    }

    let records = app_state
        .subscriptions
        .list_subscriptions()
        .await
        .map_err(port_error)?;
    let rates = app_state.rates_snapshot().await;
    let enriched = stats::enrich_all(&records, &rates);

    Ok(Json(CalendarResponse {
        year,
        month,
        days: stats::calendar_month(&enriched, year, month),
    }))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

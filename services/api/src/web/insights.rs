//! services/api/src/web/insights.rs
//!
//! The AI spending-analysis endpoint.

use crate::error::{error_response, port_error, ApiJson, ErrorResponse, HandlerError};
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtrack_core::domain::{non_blank, SpendingItem};
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Falls back to the key stored in settings when omitted.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Ask the language model for a summary of the active subscriptions.
#[utoipa::path(
    post,
    path = "/api/ai/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Model output, verbatim", body = AnalyzeResponse),
        (status = 400, description = "No API key available", body = ErrorResponse),
        (status = 500, description = "Model or storage failure", body = ErrorResponse)
    )
)]
pub async fn analyze_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, HandlerError> {
    let api_key = match non_blank(&request.api_key) {
        Some(key) => key.to_string(),
        None => {
            let stored = app_state.settings.load_settings().await.map_err(port_error)?;
            non_blank(&stored.llm_api_key)
                .map(str::to_string)
                .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "API Key is required"))?
        }
    };

    let active = app_state.active_subscriptions().await.map_err(port_error)?;
    let items: Vec<SpendingItem> = active.iter().map(SpendingItem::from).collect();
    info!("Requesting spending analysis for {} subscriptions", items.len());

    let analysis = app_state
        .insights
        .analyze_spending(&api_key, &items)
        .await
        .map_err(|e| {
            error!("AI Error: {:?}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("AI Analysis failed: {}", e),
            )
        })?;

    Ok(Json(AnalyzeResponse { analysis }))
}

pub mod insights;
pub mod notify;
pub mod rates;
pub mod rest;
pub mod settings;
pub mod state;

use crate::error::{error_response, HandlerError};
use axum::{
    http::StatusCode,
    routing::{any, delete, get, post},
    Router,
};
use state::AppState;
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use rest::ApiDoc;

async fn api_not_found() -> HandlerError {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Builds the JSON API router.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/subscriptions",
            get(rest::list_subscriptions_handler).post(rest::save_subscription_handler),
        )
        .route("/api/subscriptions/{id}", delete(rest::delete_subscription_handler))
        .route("/api/calendar", get(rest::calendar_handler))
        .route(
            "/api/settings",
            get(settings::get_settings_handler).post(settings::save_settings_handler),
        )
        .route("/api/ai/analyze", post(insights::analyze_handler))
        .route("/api/test/gotify", post(notify::test_gotify_handler))
        .route("/api/test/email", post(notify::test_email_handler))
        .route("/api/rates", get(rates::get_rates_handler))
        .route("/api/rates/refresh", post(rates::refresh_rates_handler))
        .route("/api/{*rest}", any(api_not_found))
        .route("/health", get(rest::health_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// The complete application: API, Swagger UI, and the single-page app from
/// `static_dir` with `index.html` as the fallback for client-side routes.
pub fn app(app_state: Arc<AppState>, static_dir: &Path) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .merge(api_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback_service(spa)
}

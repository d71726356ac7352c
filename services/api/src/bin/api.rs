//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{ErApiRatesAdapter, GotifyAdapter, JsonFileStore, OpenAiInsightAdapter, SmtpAdapter},
    config::Config,
    error::ApiError,
    jobs,
    web::{self, state::AppState},
};
use std::sync::Arc;
use subtrack_core::currency::RateTable;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    info!("Using data directory {}", config.data_dir.display());
    let store = Arc::new(JsonFileStore::new(config.data_dir.clone()));

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let rate_source = Arc::new(ErApiRatesAdapter::new(
        http_client.clone(),
        config.rates_api_url.clone(),
    ));
    let insights = Arc::new(OpenAiInsightAdapter::new(
        config.ai_api_base.clone(),
        config.ai_model.clone(),
    ));
    let push_channel = Arc::new(GotifyAdapter::new(http_client.clone()));
    let email_channel = Arc::new(SmtpAdapter::new());

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        subscriptions: store.clone(),
        settings: store,
        rate_source,
        insights,
        push_channel,
        email_channel,
        rates: Arc::new(RwLock::new(RateTable::fallback())),
    });

    // --- 4. Start Background Jobs ---
    let cancellation_token = CancellationToken::new();
    let reminder_task = tokio::spawn(jobs::reminder_loop(
        app_state.clone(),
        cancellation_token.clone(),
    ));
    let rates_task = tokio::spawn(jobs::rate_refresh_loop(
        app_state.clone(),
        cancellation_token.clone(),
    ));

    // --- 5. Create the Web Router ---
    let app = web::app(app_state, &config.static_dir);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    let shutdown_token = cancellation_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received.");
            shutdown_token.cancel();
        })
        .await?;

    cancellation_token.cancel();
    for task in [reminder_task, rates_task] {
        if let Err(e) = task.await {
            error!("Background job ended abnormally: {}", e);
        }
    }
    info!("Server stopped.");
    Ok(())
}

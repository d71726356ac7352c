//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the operations several handlers
//! and the background jobs have in common.

use crate::config::Config;
use chrono::{Local, NaiveDate, Utc};
use std::sync::Arc;
use subtrack_core::{
    currency::RateTable,
    domain::{EnrichedSubscription, Settings, Subscription, SubscriptionStats},
    ports::{
        ExchangeRateService, InsightService, NotificationChannel, PortError, PortResult,
        SettingsRepository, SubscriptionRepository,
    },
    stats,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub rate_source: Arc<dyn ExchangeRateService>,
    pub insights: Arc<dyn InsightService>,
    pub push_channel: Arc<dyn NotificationChannel>,
    pub email_channel: Arc<dyn NotificationChannel>,
    pub rates: Arc<RwLock<RateTable>>,
}

/// The enriched collection with its statistics, as served to the dashboard.
pub struct Overview {
    pub subscriptions: Vec<EnrichedSubscription>,
    pub stats: SubscriptionStats,
}

impl AppState {
    /// A copy of the current rate table, so a request sees one consistent table.
    pub async fn rates_snapshot(&self) -> RateTable {
        self.rates.read().await.clone()
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Loads, enriches and aggregates every subscription.
    pub async fn overview(&self, today: NaiveDate) -> PortResult<Overview> {
        let records = self.subscriptions.list_subscriptions().await?;
        // Settings only pick the display currency.
        let settings = self.settings.load_settings().await.unwrap_or_else(|e| {
            warn!("Could not load settings, showing home-currency totals: {}", e);
            Settings::default()
        });
        let rates = self.rates_snapshot().await;

        let enriched = stats::enrich_all(&records, &rates);
        let stats = stats::compute_stats(&enriched, &rates, today, settings.main_currency.as_deref());
        Ok(Overview {
            subscriptions: enriched,
            stats,
        })
    }

    /// The stored records whose `Active` flag is `Yes`.
    pub async fn active_subscriptions(&self) -> PortResult<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .list_subscriptions()
            .await?
            .into_iter()
            .filter(Subscription::is_active)
            .collect())
    }

    /// Fetches live rates and swaps in the updated table.
    ///
    /// On any failure the current table stays in place and the error is returned.
    pub async fn refresh_rates(&self) -> PortResult<RateTable> {
        let reference = self.rate_source.fetch_reference_rates().await.map_err(|e| {
            warn!("Exchange rate refresh failed, keeping current rates: {}", e);
            e
        })?;

        let mut next = self.rates_snapshot().await;
        let updated = next
            .apply_reference_rates(&reference.rates, Utc::now())
            .map_err(|e| {
                warn!("Exchange rate refresh rejected, keeping current rates: {}", e);
                PortError::Unexpected(e.to_string())
            })?;

        *self.rates.write().await = next.clone();
        info!(
            "Exchange rates updated: {} currencies from base {}",
            updated, reference.base
        );
        Ok(next)
    }
}

//! crates/subtrack_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! Storage, exchange rates, notification channels and the insight model all sit
//! behind these traits so the core stays free of I/O.

use crate::domain::{Notice, Settings, SpendingItem, Subscription};
use async_trait::async_trait;
use std::collections::HashMap;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Returns every stored record, assigning identifiers to any that lack one.
    async fn list_subscriptions(&self) -> PortResult<Vec<Subscription>>;

    /// Creates or merges a record and returns the stored version.
    async fn save_subscription(&self, subscription: Subscription) -> PortResult<Subscription>;

    /// Removes the record with `id`. Unknown identifiers are ignored.
    async fn delete_subscription(&self, id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load_settings(&self) -> PortResult<Settings>;
    async fn save_settings(&self, settings: &Settings) -> PortResult<()>;
}

/// A rate table as published by an exchange-rate provider: units of each code
/// per one unit of `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRates {
    pub base: String,
    pub rates: HashMap<String, f64>,
}

#[async_trait]
pub trait ExchangeRateService: Send + Sync {
    async fn fetch_reference_rates(&self) -> PortResult<ReferenceRates>;
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether `settings` hold enough credentials to use this channel.
    fn is_configured(&self, settings: &Settings) -> bool;

    async fn send(&self, settings: &Settings, notice: &Notice) -> PortResult<()>;
}

#[async_trait]
pub trait InsightService: Send + Sync {
    /// Asks the model for a free-text spending summary, using the caller's key.
    async fn analyze_spending(&self, api_key: &str, items: &[SpendingItem]) -> PortResult<String>;
}

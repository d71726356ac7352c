pub mod currency;
pub mod domain;
pub mod ports;
pub mod reminders;
pub mod stats;

pub use currency::{ParsedPrice, RateError, RateSource, RateTable, HOME_CURRENCY};
pub use domain::{
    CalendarDay, DisplayTotals, EnrichedSubscription, Notice, PaymentCycle, Settings,
    SpendingItem, Subscription, SubscriptionStats, TrendPoint,
};
pub use ports::{
    ExchangeRateService, InsightService, NotificationChannel, PortError, PortResult,
    ReferenceRates, SettingsRepository, SubscriptionRepository,
};

//! crates/subtrack_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//!
//! The JSON shape of `Subscription` and `Settings` is the on-disk format and the
//! wire format at the same time, so these structs carry their serde attributes.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// The value of `Active` that marks a subscription as contributing to totals.
pub const ACTIVE_YES: &str = "Yes";

/// Category used when a record has none.
pub const UNCATEGORIZED: &str = "Uncategorized";

//=========================================================================================
// Subscription
//=========================================================================================

/// A recurring payment as recorded by the user.
///
/// Every field is optional so that a partial record can be merged over a stored one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct Subscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free text such as `₹499` or `$9.99`.
    #[serde(
        rename = "Price",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<String>,
    #[serde(rename = "Payment Cycle", skip_serializing_if = "Option::is_none")]
    pub payment_cycle: Option<String>,
    #[serde(rename = "Next Payment", skip_serializing_if = "Option::is_none")]
    pub next_payment: Option<String>,
    #[serde(rename = "Category", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "Active", skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "Payment Method", skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(rename = "Notes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Subscription {
    /// Whether this record counts towards aggregate totals.
    pub fn is_active(&self) -> bool {
        self.active.as_deref().map(str::trim) == Some(ACTIVE_YES)
    }

    /// The billing cycle, if it is one of the known ones.
    pub fn cycle(&self) -> Option<PaymentCycle> {
        self.payment_cycle.as_deref()?.parse().ok()
    }

    /// The next payment date. Accepts `YYYY-MM-DD` or any text starting with it,
    /// such as an ISO-8601 timestamp.
    pub fn next_payment_date(&self) -> Option<NaiveDate> {
        let raw = self.next_payment.as_deref()?.trim();
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn price_text(&self) -> &str {
        self.price.as_deref().unwrap_or("")
    }

    pub fn category_or_default(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }

    /// Shallow merge: every field present on `patch` replaces the stored one.
    pub fn merge_from(&mut self, patch: Subscription) {
        fn take(slot: &mut Option<String>, incoming: Option<String>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }
        take(&mut self.id, patch.id);
        take(&mut self.name, patch.name);
        take(&mut self.price, patch.price);
        take(&mut self.payment_cycle, patch.payment_cycle);
        take(&mut self.next_payment, patch.next_payment);
        take(&mut self.category, patch.category);
        take(&mut self.active, patch.active);
        take(&mut self.url, patch.url);
        take(&mut self.payment_method, patch.payment_method);
        take(&mut self.notes, patch.notes);
    }
}

/// Older data files sometimes hold the price as a bare JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

//=========================================================================================
// PaymentCycle
//=========================================================================================

/// Billing recurrence of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCycle {
    Monthly,
    Quarterly,
    Yearly,
}

impl PaymentCycle {
    /// Expands a per-payment amount into `(monthly, yearly)` cost.
    pub fn expand(self, amount: f64) -> (f64, f64) {
        match self {
            PaymentCycle::Monthly => (amount, amount * 12.0),
            PaymentCycle::Quarterly => (amount / 3.0, amount * 4.0),
            PaymentCycle::Yearly => (amount / 12.0, amount),
        }
    }
}

impl FromStr for PaymentCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Monthly" => Ok(PaymentCycle::Monthly),
            "Quarterly" => Ok(PaymentCycle::Quarterly),
            "Yearly" => Ok(PaymentCycle::Yearly),
            other => Err(format!("unknown payment cycle '{}'", other)),
        }
    }
}

//=========================================================================================
// Derived (never persisted) views
//=========================================================================================

/// A subscription augmented with parsed and converted cost fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSubscription {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub value: f64,
    pub currency: String,
    #[serde(rename = "valueINR")]
    pub value_home: f64,
    pub monthly_cost: f64,
    pub yearly_cost: f64,
    pub logo_url: String,
    pub avatar_url: String,
}

/// Totals converted into the user's preferred display currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DisplayTotals {
    pub currency: String,
    pub monthly: f64,
    pub yearly: f64,
}

/// One point of the projected (synthetic) monthly spending series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrendPoint {
    pub month: String,
    pub amount: f64,
}

/// Aggregate statistics over the active subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStats {
    #[serde(rename = "totalMonthlyINR")]
    pub total_monthly: f64,
    #[serde(rename = "totalYearlyINR")]
    pub total_yearly: f64,
    #[serde(rename = "averageMonthlyINR")]
    pub average_monthly: f64,
    pub most_expensive: Option<EnrichedSubscription>,
    #[serde(rename = "dueThisMonthINR")]
    pub due_this_month: f64,
    pub category_stats: BTreeMap<String, f64>,
    pub active_count: usize,
    pub total_count: usize,
    pub display: DisplayTotals,
    pub monthly_trend: Vec<TrendPoint>,
}

/// All active payments falling on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub subscriptions: Vec<EnrichedSubscription>,
    #[serde(rename = "totalINR")]
    pub total_home: f64,
}

//=========================================================================================
// Settings
//=========================================================================================

/// The single settings record: integration credentials and display preference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Stored as `geminiApiKey`, the key the settings page reads back.
    #[serde(
        rename = "geminiApiKey",
        alias = "llmApiKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub llm_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gotify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gotify_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_currency: Option<String>,
}

/// Returns the trimmed value if it is non-empty.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Settings {
    pub fn gotify_configured(&self) -> bool {
        non_blank(&self.gotify_url).is_some() && non_blank(&self.gotify_token).is_some()
    }

    pub fn smtp_configured(&self) -> bool {
        non_blank(&self.smtp_host).is_some() && non_blank(&self.smtp_user).is_some()
    }
}

//=========================================================================================
// Insight input
//=========================================================================================

/// The projection of a subscription that is shared with the insight model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingItem {
    pub name: String,
    pub price: String,
    pub cycle: String,
    pub category: String,
}

impl From<&Subscription> for SpendingItem {
    fn from(s: &Subscription) -> Self {
        Self {
            name: s.display_name().to_string(),
            price: s.price_text().to_string(),
            cycle: s.payment_cycle.clone().unwrap_or_default(),
            category: s.category.clone().unwrap_or_default(),
        }
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

/// A message handed to a notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    /// Overrides the channel's default recipient (email only).
    pub recipient: Option<String>,
}

//! crates/subtrack_core/src/stats.rs
//!
//! Read-time enrichment of subscriptions and the aggregate statistics shown on
//! the dashboard, stats and calendar pages. Everything here is recomputed from
//! the stored records on every request; nothing is persisted.

use crate::currency::RateTable;
use crate::domain::{
    CalendarDay, DisplayTotals, EnrichedSubscription, Subscription, SubscriptionStats, TrendPoint,
};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;

/// Multipliers applied to the current monthly total to draw the projected trend.
const TREND_FACTORS: [f64; 6] = [1.0, 0.95, 1.05, 1.0, 1.1, 1.0];

/// Returns the URL of the service's logo, guessed from the name when no URL is set.
pub fn logo_url(subscription: &Subscription) -> String {
    let domain = match subscription.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string(),
        _ => {
            let compact: String = subscription
                .display_name()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            format!("{}.com", compact.to_lowercase())
        }
    };
    format!("https://logo.clearbit.com/{}", domain)
}

/// Initials avatar used when the logo service has nothing for the domain.
pub fn avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random&color=fff&size=64",
        urlencoding::encode(name)
    )
}

/// Parses, converts and expands the cost of one record.
pub fn enrich(subscription: &Subscription, rates: &RateTable) -> EnrichedSubscription {
    let parsed = rates.parse_price(subscription.price_text());
    let value_home = rates.convert_to_home(subscription.price_text());
    let (monthly_cost, yearly_cost) = subscription
        .cycle()
        .map(|cycle| cycle.expand(value_home))
        .unwrap_or((0.0, 0.0));

    EnrichedSubscription {
        logo_url: logo_url(subscription),
        avatar_url: avatar_url(subscription.display_name()),
        subscription: subscription.clone(),
        value: parsed.value,
        currency: parsed.currency,
        value_home,
        monthly_cost,
        yearly_cost,
    }
}

pub fn enrich_all(subscriptions: &[Subscription], rates: &RateTable) -> Vec<EnrichedSubscription> {
    subscriptions.iter().map(|s| enrich(s, rates)).collect()
}

/// Six synthetic points for the months ending with the one containing `today`.
pub fn projected_trend(total_monthly: f64, today: NaiveDate) -> Vec<TrendPoint> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    TREND_FACTORS
        .iter()
        .enumerate()
        .map(|(i, factor)| {
            let months_back = (TREND_FACTORS.len() - 1 - i) as u32;
            let month = first_of_month
                .checked_sub_months(Months::new(months_back))
                .unwrap_or(first_of_month);
            TrendPoint {
                month: month.format("%b").to_string(),
                amount: total_monthly * factor,
            }
        })
        .collect()
}

/// Aggregates over the active records of `enriched`.
///
/// `display_currency` is the user's preference; totals are also reported in it.
pub fn compute_stats(
    enriched: &[EnrichedSubscription],
    rates: &RateTable,
    today: NaiveDate,
    display_currency: Option<&str>,
) -> SubscriptionStats {
    let mut total_monthly = 0.0;
    let mut total_yearly = 0.0;
    let mut due_this_month = 0.0;
    let mut category_stats: BTreeMap<String, f64> = BTreeMap::new();
    let mut most_expensive: Option<&EnrichedSubscription> = None;
    let mut active_count = 0;

    for record in enriched.iter().filter(|e| e.subscription.is_active()) {
        active_count += 1;
        total_monthly += record.monthly_cost;
        total_yearly += record.yearly_cost;
        *category_stats
            .entry(record.subscription.category_or_default().to_string())
            .or_insert(0.0) += record.monthly_cost;

        // Strictly greater keeps the first of equal entries.
        if most_expensive.map_or(true, |best| record.monthly_cost > best.monthly_cost) {
            most_expensive = Some(record);
        }

        let due_now = record
            .subscription
            .next_payment_date()
            .is_some_and(|d| d.year() == today.year() && d.month() == today.month());
        if due_now {
            due_this_month += record.value_home;
        }
    }

    let average_monthly = if active_count > 0 {
        total_monthly / active_count as f64
    } else {
        0.0
    };

    let display = {
        let requested = display_currency
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(rates.home());
        let (currency, monthly) = rates.to_display(total_monthly, requested);
        let (_, yearly) = rates.to_display(total_yearly, &currency);
        DisplayTotals {
            currency,
            monthly,
            yearly,
        }
    };

    SubscriptionStats {
        total_monthly,
        total_yearly,
        average_monthly,
        most_expensive: most_expensive.cloned(),
        due_this_month,
        category_stats,
        active_count,
        total_count: enriched.len(),
        display,
        monthly_trend: projected_trend(total_monthly, today),
    }
}

/// Groups the active records whose next payment falls in `year`/`month` by day.
pub fn calendar_month(enriched: &[EnrichedSubscription], year: i32, month: u32) -> Vec<CalendarDay> {
    let mut days: BTreeMap<NaiveDate, Vec<EnrichedSubscription>> = BTreeMap::new();
    for record in enriched.iter().filter(|e| e.subscription.is_active()) {
        if let Some(date) = record.subscription.next_payment_date() {
            if date.year() == year && date.month() == month {
                days.entry(date).or_default().push(record.clone());
            }
        }
    }

    days.into_iter()
        .map(|(date, subscriptions)| CalendarDay {
            date,
            total_home: subscriptions.iter().map(|s| s.value_home).sum(),
            subscriptions,
        })
        .collect()
}

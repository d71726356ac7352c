//! crates/subtrack_core/src/reminders.rs
//!
//! Selection of subscriptions that are due soon, and the text of the messages
//! sent through the notification channels.

use crate::currency::RateTable;
use crate::domain::{Notice, Subscription};
use chrono::NaiveDate;

/// Default look-ahead of the daily reminder, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 3;

pub const REMINDER_TITLE: &str = "Upcoming Payments";
pub const REMINDER_EMAIL_SUBJECT: &str = "Upcoming Payments Reminder";
pub const TEST_TITLE: &str = "Subscriptions App Test";

/// Active records whose next payment is between `today` and `today + window_days`,
/// both inclusive, in list order.
pub fn select_due<'a>(
    subscriptions: &'a [Subscription],
    today: NaiveDate,
    window_days: i64,
) -> Vec<&'a Subscription> {
    subscriptions
        .iter()
        .filter(|s| s.is_active())
        .filter(|s| {
            s.next_payment_date()
                .map(|date| (date - today).num_days())
                .is_some_and(|diff| (0..=window_days).contains(&diff))
        })
        .collect()
}

pub fn reminder_body(due: &[&Subscription]) -> String {
    let mut body = format!("You have {} subscriptions due soon:\n", due.len());
    let lines: Vec<String> = due
        .iter()
        .map(|s| {
            format!(
                "- {} ({}) due on {}",
                s.display_name(),
                s.price_text(),
                s.next_payment.as_deref().unwrap_or("")
            )
        })
        .collect();
    body.push_str(&lines.join("\n"));
    body
}

/// Push notification for the daily reminder.
pub fn reminder_push(due: &[&Subscription]) -> Notice {
    Notice {
        title: REMINDER_TITLE.to_string(),
        body: reminder_body(due),
        recipient: None,
    }
}

/// Email for the daily reminder; it goes to the SMTP user.
pub fn reminder_email(due: &[&Subscription]) -> Notice {
    Notice {
        title: REMINDER_EMAIL_SUBJECT.to_string(),
        body: reminder_body(due),
        recipient: None,
    }
}

/// Test push summarising the active subscriptions.
pub fn test_push(active: &[&Subscription], total_monthly_home: f64, rates: &RateTable) -> Notice {
    Notice {
        title: TEST_TITLE.to_string(),
        body: format!(
            "Test Notification\n\nYou have {} active subscriptions.\nTotal Monthly: {:.2} {}",
            active.len(),
            total_monthly_home,
            rates.home()
        ),
        recipient: None,
    }
}

/// Test email listing the active subscriptions.
pub fn test_email(active: &[&Subscription], recipient: Option<String>) -> Notice {
    let lines: Vec<String> = active
        .iter()
        .map(|s| format!("- {}: {}", s.display_name(), s.price_text()))
        .collect();
    Notice {
        title: TEST_TITLE.to_string(),
        body: format!(
            "This is a test email from your Subscriptions App.\n\nYour active subscriptions:\n{}",
            lines.join("\n")
        ),
        recipient,
    }
}

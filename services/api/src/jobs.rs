//! services/api/src/jobs.rs
//!
//! Background tasks started with the server: the daily payment reminder and the
//! periodic exchange-rate refresh. Both stop when the shared
//! `CancellationToken` is cancelled.

use crate::web::state::AppState;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::sync::Arc;
use std::time::Duration;
use subtrack_core::{
    domain::{Notice, Settings},
    ports::{NotificationChannel, PortResult},
    reminders,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What a single reminder run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub due: usize,
    pub delivered: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Time from `now` until the next occurrence of `at` (tomorrow if already past).
pub fn duration_until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today_at = now.date().and_time(at);
    let next = if today_at > now {
        today_at
    } else {
        today_at + TimeDelta::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

async fn deliver(
    channel: &dyn NotificationChannel,
    settings: &Settings,
    notice: &Notice,
    report: &mut ReminderReport,
) {
    if !channel.is_configured(settings) {
        return;
    }
    match channel.send(settings, notice).await {
        Ok(()) => report.delivered.push(channel.name()),
        Err(e) => {
            error!("Reminder via {} failed: {}", channel.name(), e);
            report.failed.push(channel.name());
        }
    }
}

/// Checks for payments due within the configured window and notifies every
/// configured channel. A failing channel does not stop the others.
pub async fn run_reminder_check(app_state: &AppState, today: NaiveDate) -> PortResult<ReminderReport> {
    info!("Running daily reminder check...");
    let subscriptions = app_state.subscriptions.list_subscriptions().await?;
    let due = reminders::select_due(&subscriptions, today, app_state.config.reminder_window_days);

    let mut report = ReminderReport {
        due: due.len(),
        ..Default::default()
    };
    if due.is_empty() {
        return Ok(report);
    }
    info!("Found {} subscriptions due soon.", due.len());

    let settings = app_state.settings.load_settings().await?;
    if !settings.gotify_configured() && !settings.smtp_configured() {
        info!("No notification channel configured; skipping reminders.");
        return Ok(report);
    }

    deliver(
        app_state.push_channel.as_ref(),
        &settings,
        &reminders::reminder_push(&due),
        &mut report,
    )
    .await;
    deliver(
        app_state.email_channel.as_ref(),
        &settings,
        &reminders::reminder_email(&due),
        &mut report,
    )
    .await;

    Ok(report)
}

/// Runs the reminder check every day at `config.reminder_time` local time.
pub async fn reminder_loop(app_state: Arc<AppState>, cancellation_token: CancellationToken) {
    let at = app_state.config.reminder_time;
    loop {
        let wait = duration_until_next(Local::now().naive_local(), at);
        info!("Next reminder check in {} minutes", wait.as_secs() / 60);

        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Reminder job cancelled.");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        if let Err(e) = run_reminder_check(&app_state, Local::now().date_naive()).await {
            error!("Reminder check failed: {}", e);
        }
    }
}

/// Refreshes exchange rates immediately and then on every interval tick.
pub async fn rate_refresh_loop(app_state: Arc<AppState>, cancellation_token: CancellationToken) {
    let mut interval = tokio::time::interval(app_state.config.rates_refresh_interval);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Rate refresh job cancelled.");
                return;
            }
            _ = interval.tick() => {
                if app_state.refresh_rates().await.is_err() {
                    warn!("Using previous exchange rates until the next refresh.");
                }
            }
        }
    }
}

use std::time::Duration;

use chrono::{DateTime, Days, Local, TimeZone, Utc};
use tokio::task::JoinHandle;

use crate::models::{TaskDocument, Timestamp};
use crate::server::TaskRepository;

const HOUR_MILLIS: i64 = 60 * 60 * 1000;

/// The first `hour:00` local time strictly after `now`, skipping days where
/// that wall-clock time does not exist.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();
    (0..=2)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|day| day.and_hms_opt(hour, 0, 0))
        .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
        .find(|candidate| candidate > now)
}

/// Logs a reminder for every incomplete task due within `window_hours` of `now`.
pub fn run_reminders(repo: &TaskRepository, now: Timestamp, window_hours: i64) -> Vec<TaskDocument> {
    let due = repo.due_by(now.saturating_add(window_hours.saturating_mul(HOUR_MILLIS)));
    for task in &due {
        log::info!("Reminder: Task \"{}\" is due soon!", task.title);
    }
    log::debug!("reminder scan found {} due tasks", due.len());
    due
}

pub fn start_reminder_job(repo: TaskRepository, hour: u32, window_hours: i64) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = next_run_after(&now, hour) else {
                log::error!("reminder job stopped: no valid run time for hour={hour}");
                return;
            };
            let wait = next.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO);
            log::debug!("next reminder scan at {}", next.to_rfc3339());
            tokio::time::sleep(wait).await;
            run_reminders(&repo, Utc::now().timestamp_millis(), window_hours);
        }
    })
}

/// Dashboard aggregation engine
///
/// Computes the per-user dashboard counters from the task store. All seven
/// counters are derived from one [`StatWindows`] snapshot so they reflect
/// the same logical "now" even though the sub-queries run in parallel.
///
/// Day boundaries ("completed today", "due tomorrow") use the server's
/// local timezone; the window arithmetic lives in [`StatWindows::at`] so it
/// can be tested against fixed instants.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::task::TaskStatus;
use crate::query::TaskPredicate;
use crate::store::{StoreError, TaskStore};

/// Per-user dashboard counters.
///
/// Point-in-time snapshot; no caching layer sits in front of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Assigned to the user and not completed
    pub assigned_tasks: i64,

    /// Created by the user, any status
    pub created_tasks: i64,

    /// Assigned to the user, past due, not completed
    pub overdue_tasks: i64,

    /// Assigned to the user and completed
    pub completed_tasks: i64,

    /// Assigned to the user, completed, last touched since local midnight
    pub tasks_completed_today: i64,

    /// Created by the user within the last 7 days
    pub tasks_created_this_week: i64,

    /// Assigned to the user, not completed, due within tomorrow's local day
    pub tasks_due_tomorrow: i64,
}

/// Time windows anchoring the dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatWindows {
    /// The instant all counters are relative to
    pub now: DateTime<Utc>,

    /// Local midnight at the start of today
    pub start_of_today: DateTime<Utc>,

    /// Local midnight at the start of tomorrow
    pub tomorrow_start: DateTime<Utc>,

    /// Local midnight at the start of the day after tomorrow
    pub day_after_tomorrow_start: DateTime<Utc>,

    /// Exactly seven days before `now`
    pub week_ago: DateTime<Utc>,
}

impl StatWindows {
    /// Builds the windows for a given local instant.
    pub fn at(now_local: DateTime<Local>) -> Self {
        let today = now_local.date_naive();
        let now = now_local.with_timezone(&Utc);

        Self {
            now,
            start_of_today: local_day_start(today),
            tomorrow_start: local_day_start(next_day(today, 1)),
            day_after_tomorrow_start: local_day_start(next_day(today, 2)),
            week_ago: now - chrono::Duration::days(7),
        }
    }
}

fn next_day(date: NaiveDate, days: u64) -> NaiveDate {
    // NaiveDate covers year ±262143; task due dates never get near the edge,
    // but fall back to the same day rather than panic.
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

/// Converts a local calendar date's midnight to a UTC instant.
///
/// During a DST transition local midnight can be ambiguous or nonexistent;
/// the earliest valid interpretation is used, falling back to treating the
/// naive midnight as UTC when the wall-clock time does not exist at all.
fn local_day_start(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        chrono::LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

/// Computes all seven counters for a user.
///
/// Sub-queries run concurrently via `try_join!`; they all share the same
/// `windows` snapshot, so the result is consistent with a single "now".
pub async fn dashboard_stats(
    store: &dyn TaskStore,
    user_id: Uuid,
    windows: StatWindows,
) -> Result<DashboardStats, StoreError> {
    let assigned_open = TaskPredicate {
        assignee: Some(user_id),
        status_not: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let created = TaskPredicate {
        creator: Some(user_id),
        ..Default::default()
    };
    let overdue = TaskPredicate {
        assignee: Some(user_id),
        status_not: Some(TaskStatus::Completed),
        due_before: Some(windows.now),
        ..Default::default()
    };
    let completed = TaskPredicate {
        assignee: Some(user_id),
        status: Some(TaskStatus::Completed),
        ..Default::default()
    };
    let completed_today = TaskPredicate {
        assignee: Some(user_id),
        status: Some(TaskStatus::Completed),
        updated_after: Some(windows.start_of_today),
        ..Default::default()
    };
    let created_this_week = TaskPredicate {
        creator: Some(user_id),
        created_after: Some(windows.week_ago),
        ..Default::default()
    };
    let due_tomorrow = TaskPredicate {
        assignee: Some(user_id),
        status_not: Some(TaskStatus::Completed),
        due_within: Some((windows.tomorrow_start, windows.day_after_tomorrow_start)),
        ..Default::default()
    };

    let (
        assigned_tasks,
        created_tasks,
        overdue_tasks,
        completed_tasks,
        tasks_completed_today,
        tasks_created_this_week,
        tasks_due_tomorrow,
    ) = tokio::try_join!(
        store.count(&assigned_open),
        store.count(&created),
        store.count(&overdue),
        store.count(&completed),
        store.count(&completed_today),
        store.count(&created_this_week),
        store.count(&due_tomorrow),
    )?;

    Ok(DashboardStats {
        assigned_tasks,
        created_tasks,
        overdue_tasks,
        completed_tasks,
        tasks_completed_today,
        tasks_created_this_week,
        tasks_due_tomorrow,
    })
}

//! Activity timeline filtering and this-month statistics.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use entity::{Activity, ActivityKind, RecordId};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub kind: Option<ActivityKind>,
    pub contact_id: Option<RecordId>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        self.kind.is_none_or(|kind| activity.kind == kind)
            && self.contact_id.is_none_or(|id| activity.contact_id == id)
    }

    /// Matching activities, newest first.
    pub fn apply<'a>(&self, activities: &'a [Activity]) -> Vec<&'a Activity> {
        let mut found: Vec<&Activity> = activities.iter().filter(|a| self.matches(a)).collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        found
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: ActivityKind,
    pub count: usize,
}

/// One entry per activity kind, in display order.
pub fn count_by_kind<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> Vec<KindCount> {
    let mut counts: Vec<KindCount> = ActivityKind::ALL
        .into_iter()
        .map(|kind| KindCount { kind, count: 0 })
        .collect();
    for activity in activities {
        if let Some(entry) = counts.iter_mut().find(|entry| entry.kind == activity.kind) {
            entry.count += 1;
        }
    }
    counts
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthStats {
    pub total: usize,
    pub by_kind: Vec<KindCount>,
}

pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .unwrap_or_else(|| now.date_naive())
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Activities dated on or after the first day of `now`'s month.
pub fn month_stats(activities: &[Activity], now: DateTime<Utc>) -> MonthStats {
    let since = start_of_month(now);
    let current: Vec<&Activity> = activities.iter().filter(|a| a.date >= since).collect();
    MonthStats {
        total: current.len(),
        by_kind: count_by_kind(current),
    }
}

//! Report metrics over a trailing time range.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use entity::{Deal, Money, Stage};
use serde::Serialize;
use tracing::info_span;

use crate::{
    activities::{KindCount, count_by_kind},
    dashboard::win_rate,
    pipeline::{stage_total, total_value},
    workspace::Workspace,
};

pub const TREND_MONTHS: u32 = 6;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ReportRange {
    #[default]
    Last30Days,
    Last60Days,
    Last90Days,
    ThisYear,
}

impl ReportRange {
    pub const ALL: [ReportRange; 4] = [
        ReportRange::Last30Days,
        ReportRange::Last60Days,
        ReportRange::Last90Days,
        ReportRange::ThisYear,
    ];

    pub fn days(self) -> i64 {
        match self {
            ReportRange::Last30Days => 30,
            ReportRange::Last60Days => 60,
            ReportRange::Last90Days => 90,
            ReportRange::ThisYear => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportRange::Last30Days => "Last 30 Days",
            ReportRange::Last60Days => "Last 60 Days",
            ReportRange::Last90Days => "Last 90 Days",
            ReportRange::ThisYear => "This Year",
        }
    }

    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl fmt::Display for ReportRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportRange {
    type Err = String;

    /// Accepts the day count (`30`, `60`, `90`, `365`) or `year`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "30" => Ok(ReportRange::Last30Days),
            "60" => Ok(ReportRange::Last60Days),
            "90" => Ok(ReportRange::Last90Days),
            "365" | "year" => Ok(ReportRange::ThisYear),
            other => Err(format!("unsupported report range {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyMetrics {
    pub total_contacts: usize,
    pub total_deals: usize,
    pub total_value: Money,
    pub closed_value: Money,
    pub win_rate: u32,
    /// Mean closed deal, whole units.
    pub average_deal_size: Money,
    pub total_activities: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageBreakdown {
    pub stage: Stage,
    pub count: usize,
    pub value: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthTrend {
    pub year: i32,
    pub month: u32,
    /// Short month name, e.g. `Mar`.
    pub label: String,
    pub count: usize,
    pub value: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub range: ReportRange,
    pub metrics: KeyMetrics,
    pub stages: Vec<StageBreakdown>,
    pub activities: Vec<KindCount>,
    pub trend: Vec<MonthTrend>,
}

fn created_since(created_at: Option<DateTime<Utc>>, cutoff: DateTime<Utc>) -> bool {
    created_at.is_some_and(|at| at >= cutoff)
}

fn round_to_units(amount: Money) -> Money {
    Money::from_cents(amount.cents().saturating_add(50) / 100 * 100)
}

/// `(year, month)` pairs for the last `count` months, oldest first, ending at `now`.
fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<(i32, u32)> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%b").to_string())
        .unwrap_or_default()
}

/// Deal count and value per creation month. Ignores the report range.
pub fn monthly_trend(deals: &[Deal], now: DateTime<Utc>) -> Vec<MonthTrend> {
    trailing_months(now, TREND_MONTHS)
        .into_iter()
        .map(|(year, month)| {
            let in_month: Vec<&Deal> = deals
                .iter()
                .filter(|deal| {
                    deal.created_at
                        .is_some_and(|at| at.year() == year && at.month() == month)
                })
                .collect();
            MonthTrend {
                year,
                month,
                label: month_label(year, month),
                count: in_month.len(),
                value: in_month.iter().map(|deal| deal.amount()).sum(),
            }
        })
        .collect()
}

impl Report {
    pub fn compute(workspace: &Workspace, range: ReportRange, now: DateTime<Utc>) -> Self {
        let span = info_span!("crm.report", range = range.days());
        let _guard = span.enter();

        let cutoff = range.cutoff(now);
        let deals: Vec<Deal> = workspace
            .deals
            .iter()
            .filter(|deal| created_since(deal.created_at, cutoff))
            .cloned()
            .collect();
        let total_contacts = workspace
            .contacts
            .iter()
            .filter(|contact| created_since(contact.created_at, cutoff))
            .count();
        let activities: Vec<_> = workspace
            .activities
            .iter()
            .filter(|activity| activity.date >= cutoff)
            .collect();

        let closed: Vec<&Deal> = deals.iter().filter(|deal| deal.is_closed()).collect();
        let closed_value: Money = closed.iter().map(|deal| deal.amount()).sum();
        let average_deal_size = round_to_units(closed_value.div_round(closed.len() as u64));

        let metrics = KeyMetrics {
            total_contacts,
            total_deals: deals.len(),
            total_value: total_value(&deals),
            closed_value,
            win_rate: win_rate(closed.len(), deals.len()),
            average_deal_size,
            total_activities: activities.len(),
        };

        let stages = Stage::ALL
            .into_iter()
            .map(|stage| StageBreakdown {
                stage,
                count: deals.iter().filter(|deal| deal.stage.is(stage)).count(),
                value: stage_total(&deals, stage),
            })
            .collect();

        Self {
            range,
            metrics,
            stages,
            activities: count_by_kind(activities),
            trend: monthly_trend(&workspace.deals, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use entity::{Activity, ActivityKind, Contact};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
    }

    fn deal(id: i64, stage: &str, value: f64, created: &str) -> Deal {
        serde_json::from_value(json!({
            "Id": id, "title": format!("Deal {id}"), "value": value,
            "stage": stage, "contactId": 1, "createdAt": created
        }))
        .unwrap()
    }

    fn contact(id: i64, created: Option<&str>) -> Contact {
        serde_json::from_value(json!({
            "Id": id, "firstName": "A", "lastName": "B", "email": "a@b.co",
            "company": "C", "createdAt": created
        }))
        .unwrap()
    }

    fn activity(id: i64, kind: &str, date: &str) -> Activity {
        serde_json::from_value(json!({
            "Id": id, "type": kind, "contactId": 1, "subject": "s", "date": date
        }))
        .unwrap()
    }

    fn workspace() -> Workspace {
        Workspace {
            contacts: vec![
                contact(1, Some("2025-03-01")),
                contact(2, Some("2024-06-01")),
                contact(3, None),
            ],
            deals: vec![
                deal(1, "Closed", 1000.0, "2025-03-10"),
                deal(2, "Closed", 1001.0, "2025-02-20"),
                deal(3, "Lead", 400.0, "2025-03-01"),
                deal(4, "Proposal", 250.0, "2024-12-20"),
                deal(5, "legacy", 50.0, "2025-03-05"),
            ],
            activities: vec![
                activity(1, "Call", "2025-03-14"),
                activity(2, "Email", "2025-02-01"),
                activity(3, "Meeting", "2024-11-01"),
            ],
        }
    }

    #[test]
    fn key_metrics_follow_the_range() {
        let report = Report::compute(&workspace(), ReportRange::Last30Days, now());
        let metrics = &report.metrics;
        assert_eq!(metrics.total_contacts, 1);
        assert_eq!(metrics.total_deals, 4);
        assert_eq!(metrics.total_value, Money::from_units(2451));
        assert_eq!(metrics.closed_value, Money::from_units(2001));
        assert_eq!(metrics.win_rate, 50);
        assert_eq!(metrics.average_deal_size, Money::from_units(1001));
        assert_eq!(metrics.total_activities, 1);

        let year = Report::compute(&workspace(), ReportRange::ThisYear, now());
        assert_eq!(year.metrics.total_deals, 5);
        assert_eq!(year.metrics.total_contacts, 2);
        assert_eq!(year.metrics.total_activities, 3);
    }

    #[test]
    fn stage_breakdown_and_activity_distribution() {
        let report = Report::compute(&workspace(), ReportRange::Last90Days, now());
        let closed = report.stages.iter().find(|s| s.stage == Stage::Closed).unwrap();
        assert_eq!(closed.count, 2);
        assert_eq!(closed.value, Money::from_units(2001));
        let counted: usize = report.stages.iter().map(|s| s.count).sum();
        assert_eq!(counted, 4);
        let kinds: Vec<(ActivityKind, usize)> =
            report.activities.iter().map(|k| (k.kind, k.count)).collect();
        assert_eq!(
            kinds,
            [
                (ActivityKind::Call, 1),
                (ActivityKind::Email, 1),
                (ActivityKind::Meeting, 0),
                (ActivityKind::Note, 0),
            ]
        );
    }

    #[test]
    fn trend_covers_six_months_ending_now() {
        let trend = monthly_trend(&workspace().deals, now());
        let months: Vec<(i32, u32)> = trend.iter().map(|t| (t.year, t.month)).collect();
        assert_eq!(
            months,
            [(2024, 10), (2024, 11), (2024, 12), (2025, 1), (2025, 2), (2025, 3)]
        );
        assert_eq!(trend[0].label, "Oct");
        assert_eq!(trend[2].count, 1);
        assert_eq!(trend[5].count, 3);
        assert_eq!(trend[5].value, Money::from_units(1450));
    }

    #[test]
    fn parses_range_options() {
        assert_eq!("90".parse(), Ok(ReportRange::Last90Days));
        assert_eq!("Year".parse(), Ok(ReportRange::ThisYear));
        assert!("7".parse::<ReportRange>().is_err());
        assert_eq!(ReportRange::ALL.map(ReportRange::days), [30, 60, 90, 365]);
    }
}

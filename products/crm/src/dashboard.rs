use chrono::{Duration, NaiveDate};
use entity::{Activity, Deal, Money};
use serde::Serialize;
use tracing::info_span;

use crate::{pipeline::total_value, workspace::Workspace};

pub const RECENT_ACTIVITY_LIMIT: usize = 5;
pub const UPCOMING_CLOSE_LIMIT: usize = 5;
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_contacts: usize,
    pub total_deals: usize,
    pub total_value: Money,
    /// Closed deals over all deals, rounded percent.
    pub win_rate: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_activities: Vec<Activity>,
    pub upcoming_closes: Vec<Deal>,
}

/// Rounded percentage, half up; zero when there is nothing to divide by.
pub fn win_rate(closed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((closed * 200 + total) / (total * 2)) as u32
}

impl Dashboard {
    pub fn compute(workspace: &Workspace, today: NaiveDate) -> Self {
        let span = info_span!(
            "crm.dashboard",
            contacts = workspace.contacts.len(),
            deals = workspace.deals.len(),
            activities = workspace.activities.len()
        );
        let _guard = span.enter();

        let closed = workspace.deals.iter().filter(|d| d.is_closed()).count();
        let stats = DashboardStats {
            total_contacts: workspace.contacts.len(),
            total_deals: workspace.deals.len(),
            total_value: total_value(&workspace.deals),
            win_rate: win_rate(closed, workspace.deals.len()),
        };

        let mut recent_activities = workspace.activities.clone();
        recent_activities.sort_by(|a, b| b.date.cmp(&a.date));
        recent_activities.truncate(RECENT_ACTIVITY_LIMIT);

        let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
        let upcoming_closes = workspace
            .deals
            .iter()
            .filter(|deal| !deal.is_closed())
            .filter(|deal| {
                deal.expected_close_date
                    .is_some_and(|date| date >= today && date <= horizon)
            })
            .take(UPCOMING_CLOSE_LIMIT)
            .cloned()
            .collect();

        Self {
            stats,
            recent_activities,
            upcoming_closes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deal(id: i64, stage: &str, value: i64, close: Option<&str>) -> Deal {
        serde_json::from_value(json!({
            "Id": id, "title": format!("Deal {id}"), "value": value,
            "stage": stage, "contactId": 1, "expectedCloseDate": close
        }))
        .unwrap()
    }

    fn activity(id: i64, date: &str) -> Activity {
        serde_json::from_value(json!({
            "Id": id, "type": "Note", "contactId": 1, "subject": "n", "date": date
        }))
        .unwrap()
    }

    #[test]
    fn win_rate_rounds_half_up() {
        assert_eq!(win_rate(0, 0), 0);
        assert_eq!(win_rate(1, 3), 33);
        assert_eq!(win_rate(2, 3), 67);
        assert_eq!(win_rate(1, 8), 13);
        assert_eq!(win_rate(4, 4), 100);
    }

    #[test]
    fn stats_cover_every_deal() {
        let workspace = Workspace {
            contacts: Vec::new(),
            deals: vec![
                deal(1, "Lead", 1000, None),
                deal(2, "closed", 500, None),
                deal(3, "unknown-stage", 250, None),
            ],
            activities: Vec::new(),
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let dashboard = Dashboard::compute(&workspace, today);
        assert_eq!(dashboard.stats.total_deals, 3);
        assert_eq!(dashboard.stats.total_value, Money::from_units(1750));
        assert_eq!(dashboard.stats.win_rate, 33);
    }

    #[test]
    fn upcoming_closes_within_a_week_and_open() {
        let workspace = Workspace {
            contacts: Vec::new(),
            deals: vec![
                deal(1, "Lead", 1, Some("2025-06-01")),
                deal(2, "Proposal", 1, Some("2025-06-08")),
                deal(3, "Proposal", 1, Some("2025-06-09")),
                deal(4, "Closed", 1, Some("2025-06-03")),
                deal(5, "Lead", 1, Some("2025-05-31")),
                deal(6, "Lead", 1, None),
            ],
            activities: Vec::new(),
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let upcoming: Vec<i64> = Dashboard::compute(&workspace, today)
            .upcoming_closes
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(upcoming, [1, 2]);
    }

    #[test]
    fn keeps_five_newest_activities() {
        let workspace = Workspace {
            contacts: Vec::new(),
            deals: Vec::new(),
            activities: (1..=7)
                .map(|day| activity(day, &format!("2025-01-0{day}")))
                .collect(),
        };
        let today = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let recent: Vec<i64> = Dashboard::compute(&workspace, today)
            .recent_activities
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(recent, [7, 6, 5, 4, 3]);
    }
}

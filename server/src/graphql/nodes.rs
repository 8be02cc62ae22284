use async_graphql::{Enum, ID, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use crm::{
    Dashboard, KindCount, MonthStats, Notification, Report, ReportRange, Severity, StageBuckets,
    StageColumn,
};
use entity::{Activity, ActivityKind, Contact, Deal, Money, RecordId, Stage};

fn count(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn node_id(id: RecordId) -> ID {
    ID::from(id.to_string())
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DealStage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Closed,
}

impl From<Stage> for DealStage {
    fn from(value: Stage) -> Self {
        match value {
            Stage::Lead => DealStage::Lead,
            Stage::Qualified => DealStage::Qualified,
            Stage::Proposal => DealStage::Proposal,
            Stage::Negotiation => DealStage::Negotiation,
            Stage::Closed => DealStage::Closed,
        }
    }
}

impl From<DealStage> for Stage {
    fn from(value: DealStage) -> Self {
        match value {
            DealStage::Lead => Stage::Lead,
            DealStage::Qualified => Stage::Qualified,
            DealStage::Proposal => Stage::Proposal,
            DealStage::Negotiation => Stage::Negotiation,
            DealStage::Closed => Stage::Closed,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Note,
}

impl From<ActivityKind> for ActivityType {
    fn from(value: ActivityKind) -> Self {
        match value {
            ActivityKind::Call => ActivityType::Call,
            ActivityKind::Email => ActivityType::Email,
            ActivityKind::Meeting => ActivityType::Meeting,
            ActivityKind::Note => ActivityType::Note,
        }
    }
}

impl From<ActivityType> for ActivityKind {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Call => ActivityKind::Call,
            ActivityType::Email => ActivityKind::Email,
            ActivityType::Meeting => ActivityKind::Meeting,
            ActivityType::Note => ActivityKind::Note,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum ReportRangeOption {
    #[default]
    #[graphql(name = "LAST_30_DAYS")]
    Last30Days,
    #[graphql(name = "LAST_60_DAYS")]
    Last60Days,
    #[graphql(name = "LAST_90_DAYS")]
    Last90Days,
    #[graphql(name = "THIS_YEAR")]
    ThisYear,
}

impl From<ReportRangeOption> for ReportRange {
    fn from(value: ReportRangeOption) -> Self {
        match value {
            ReportRangeOption::Last30Days => ReportRange::Last30Days,
            ReportRangeOption::Last60Days => ReportRange::Last60Days,
            ReportRangeOption::Last90Days => ReportRange::Last90Days,
            ReportRangeOption::ThisYear => ReportRange::ThisYear,
        }
    }
}

impl From<ReportRange> for ReportRangeOption {
    fn from(value: ReportRange) -> Self {
        match value {
            ReportRange::Last30Days => ReportRangeOption::Last30Days,
            ReportRange::Last60Days => ReportRangeOption::Last60Days,
            ReportRange::Last90Days => ReportRangeOption::Last90Days,
            ReportRange::ThisYear => ReportRangeOption::ThisYear,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum NotificationSeverity {
    Success,
    Warning,
    Error,
    Info,
}

impl From<Severity> for NotificationSeverity {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Success => NotificationSeverity::Success,
            Severity::Warning => NotificationSeverity::Warning,
            Severity::Error => NotificationSeverity::Error,
            Severity::Info => NotificationSeverity::Info,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Contact")]
pub struct ContactNode {
    pub id: ID,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: String,
    pub position: Option<String>,
    pub notes: Option<String>,
    /// "First Last - Company", as shown in pickers.
    pub label: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Contact> for ContactNode {
    fn from(contact: Contact) -> Self {
        Self {
            id: node_id(contact.id),
            full_name: contact.full_name(),
            label: contact.label(),
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
            company: contact.company,
            position: contact.position,
            notes: contact.notes,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Deal")]
pub struct DealNode {
    pub id: ID,
    pub title: String,
    pub value_cents: Option<i64>,
    /// Whole-dollar display, e.g. `$3,000`.
    pub value_display: String,
    /// `null` when the stored stage is not a pipeline stage.
    pub stage: Option<DealStage>,
    /// Stage as stored.
    pub stage_name: String,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub contact_id: ID,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Deal> for DealNode {
    fn from(deal: Deal) -> Self {
        Self {
            id: node_id(deal.id),
            value_cents: deal.value.map(Money::cents),
            value_display: deal.amount().format_usd(),
            stage: deal.stage.known().map(DealStage::from),
            stage_name: deal.stage.as_str().to_string(),
            probability: i32::from(deal.probability),
            expected_close_date: deal.expected_close_date,
            contact_id: node_id(deal.contact_id),
            title: deal.title,
            notes: deal.notes,
            created_at: deal.created_at,
            updated_at: deal.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Activity")]
pub struct ActivityNode {
    pub id: ID,
    #[graphql(name = "type")]
    pub kind: ActivityType,
    pub contact_id: ID,
    pub deal_id: Option<ID>,
    pub subject: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Activity> for ActivityNode {
    fn from(activity: Activity) -> Self {
        Self {
            id: node_id(activity.id),
            kind: activity.kind.into(),
            contact_id: node_id(activity.contact_id),
            deal_id: activity.deal_id.map(node_id),
            subject: activity.subject,
            notes: activity.notes,
            date: activity.date,
            created_at: activity.created_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PipelineColumn {
    pub stage: DealStage,
    pub count: i32,
    pub total_value_cents: i64,
    pub total_value_display: String,
    pub deals: Vec<DealNode>,
}

impl From<StageColumn> for PipelineColumn {
    fn from(column: StageColumn) -> Self {
        let total = column.total();
        Self {
            stage: column.stage.into(),
            count: count(column.deals.len()),
            total_value_cents: total.cents(),
            total_value_display: total.format_usd(),
            deals: column.deals.into_iter().map(DealNode::from).collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PipelineBoard {
    pub columns: Vec<PipelineColumn>,
    /// Deals whose stage matches no column.
    pub unmatched: Vec<DealNode>,
    pub total_count: i32,
    /// Includes unmatched deals.
    pub total_value_cents: i64,
}

impl PipelineBoard {
    pub fn new(buckets: StageBuckets, total_value: Money) -> Self {
        let total_count = count(buckets.matched_count() + buckets.unmatched.len());
        Self {
            columns: buckets.columns.into_iter().map(PipelineColumn::from).collect(),
            unmatched: buckets.unmatched.into_iter().map(DealNode::from).collect(),
            total_count,
            total_value_cents: total_value.cents(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DashboardPayload {
    pub total_contacts: i32,
    pub total_deals: i32,
    pub total_value_cents: i64,
    pub total_value_display: String,
    pub win_rate: i32,
    pub recent_activities: Vec<ActivityNode>,
    pub upcoming_closes: Vec<DealNode>,
}

impl From<Dashboard> for DashboardPayload {
    fn from(dashboard: Dashboard) -> Self {
        let stats = dashboard.stats;
        Self {
            total_contacts: count(stats.total_contacts),
            total_deals: count(stats.total_deals),
            total_value_cents: stats.total_value.cents(),
            total_value_display: stats.total_value.format_usd(),
            win_rate: stats.win_rate as i32,
            recent_activities: dashboard
                .recent_activities
                .into_iter()
                .map(ActivityNode::from)
                .collect(),
            upcoming_closes: dashboard
                .upcoming_closes
                .into_iter()
                .map(DealNode::from)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ActivityCount {
    #[graphql(name = "type")]
    pub kind: ActivityType,
    pub count: i32,
}

impl From<KindCount> for ActivityCount {
    fn from(value: KindCount) -> Self {
        Self {
            kind: value.kind.into(),
            count: count(value.count),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ActivityStats {
    pub total: i32,
    pub by_type: Vec<ActivityCount>,
}

impl From<MonthStats> for ActivityStats {
    fn from(stats: MonthStats) -> Self {
        Self {
            total: count(stats.total),
            by_type: stats.by_kind.into_iter().map(ActivityCount::from).collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ReportMetrics {
    pub total_contacts: i32,
    pub total_deals: i32,
    pub total_value_cents: i64,
    pub closed_value_cents: i64,
    pub win_rate: i32,
    pub average_deal_size_cents: i64,
    pub total_activities: i32,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct StageTotals {
    pub stage: DealStage,
    pub count: i32,
    pub value_cents: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct TrendPoint {
    pub year: i32,
    pub month: i32,
    pub label: String,
    pub count: i32,
    pub value_cents: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ReportPayload {
    pub range: ReportRangeOption,
    pub metrics: ReportMetrics,
    pub stages: Vec<StageTotals>,
    pub activities: Vec<ActivityCount>,
    pub trend: Vec<TrendPoint>,
}

impl From<Report> for ReportPayload {
    fn from(report: Report) -> Self {
        let metrics = report.metrics;
        Self {
            range: report.range.into(),
            metrics: ReportMetrics {
                total_contacts: count(metrics.total_contacts),
                total_deals: count(metrics.total_deals),
                total_value_cents: metrics.total_value.cents(),
                closed_value_cents: metrics.closed_value.cents(),
                win_rate: metrics.win_rate as i32,
                average_deal_size_cents: metrics.average_deal_size.cents(),
                total_activities: count(metrics.total_activities),
            },
            stages: report
                .stages
                .into_iter()
                .map(|row| StageTotals {
                    stage: row.stage.into(),
                    count: count(row.count),
                    value_cents: row.value.cents(),
                })
                .collect(),
            activities: report
                .activities
                .into_iter()
                .map(ActivityCount::from)
                .collect(),
            trend: report
                .trend
                .into_iter()
                .map(|point| TrendPoint {
                    year: point.year,
                    month: point.month as i32,
                    label: point.label,
                    count: count(point.count),
                    value_cents: point.value.cents(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Notification")]
pub struct NotificationNode {
    pub severity: NotificationSeverity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl From<Notification> for NotificationNode {
    fn from(value: Notification) -> Self {
        Self {
            severity: value.severity.into(),
            message: value.message,
            at: value.at,
        }
    }
}

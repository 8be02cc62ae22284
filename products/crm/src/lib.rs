//! CRM vertical: record adapters, the pipeline board and the derived views.

pub mod activities;
pub mod contacts;
pub mod dashboard;
pub mod notify;
pub mod pipeline;
pub mod reports;
pub mod seed;
pub mod service;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use activities::{ActivityFilter, KindCount, MonthStats, month_stats};
pub use contacts::{ContactFilter, companies};
pub use dashboard::{Dashboard, DashboardStats};
pub use notify::{Notification, NotificationFeed, Notifier, Severity, TracingNotifier};
pub use pipeline::{
    DragState, PipelineBoard, StageBuckets, StageColumn, group_by_stage, stage_total, total_value,
};
pub use reports::{KeyMetrics, MonthTrend, Report, ReportRange, StageBreakdown};
pub use seed::{SeedSummary, seed_demo};
pub use service::{ActivityService, ContactService, DealService, EntityService, Notices};
pub use workspace::{CrmServices, Workspace};
